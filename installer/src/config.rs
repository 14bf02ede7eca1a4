//! Immutable installer configuration.
//!
//! [`InstallConfig`] is resolved once at startup from CLI overrides and
//! platform defaults, validated, and then passed by reference to every stage.
//! All paths it hands out are absolute, so no stage depends on the process
//! working directory.

use crate::cli::Cli;
use crate::dirs::BaseDirs;
use crate::error::{InstallerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::path::PathBuf;

/// Repository URL for cloning skatos.
pub const SKATOS_REPO_URL: &str = "https://github.com/skatos-dev/skatos";

/// Name of the package, the cache subdirectory, and the installed binary.
pub const PROJECT_NAME: &str = "skatos";

/// Directory, relative to the checkout, that cargo writes build output into.
pub const BUILD_OUTPUT_DIR: &str = "target";

/// Validated configuration shared by all pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallConfig {
    repo_url: String,
    install_dir: Utf8PathBuf,
    cache_root: Utf8PathBuf,
    project_name: String,
}

impl InstallConfig {
    /// Build a configuration from explicit values.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::InvalidConfig`] if either directory is
    /// relative or the repository URL or project name is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use skatos_installer::config::InstallConfig;
    ///
    /// let config = InstallConfig::new(
    ///     "https://example.com/skatos.git",
    ///     "/home/me/.local/bin".into(),
    ///     "/home/me/.cache".into(),
    ///     "skatos",
    /// )?;
    /// assert_eq!(config.cache_dir(), "/home/me/.cache/skatos");
    /// # Ok::<(), skatos_installer::error::InstallerError>(())
    /// ```
    pub fn new(
        repo_url: impl Into<String>,
        install_dir: Utf8PathBuf,
        cache_root: Utf8PathBuf,
        project_name: impl Into<String>,
    ) -> Result<Self> {
        let repo_url = repo_url.into();
        let project_name = project_name.into();

        if repo_url.trim().is_empty() {
            return Err(invalid("repository URL must not be empty"));
        }
        if project_name.is_empty() || project_name.contains(['/', '\\']) {
            return Err(invalid(format!(
                "project name `{project_name}` must be a single path component"
            )));
        }
        require_absolute("install directory", &install_dir)?;
        require_absolute("cache directory", &cache_root)?;

        Ok(Self {
            repo_url,
            install_dir,
            cache_root,
            project_name,
        })
    }

    /// Resolve the configuration from CLI overrides and platform defaults.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::InvalidConfig`] if a default directory
    /// cannot be determined or any resulting path is invalid.
    pub fn resolve(cli: &Cli, dirs: &dyn BaseDirs) -> Result<Self> {
        let install_dir = match &cli.install_dir {
            Some(dir) => dir.clone(),
            None => utf8_dir(dirs.bin_dir(), "binary")?,
        };
        let cache_root = match &cli.cache_dir {
            Some(dir) => dir.clone(),
            None => utf8_dir(dirs.cache_dir(), "cache")?,
        };
        let repo_url = cli.repo_url.as_deref().unwrap_or(SKATOS_REPO_URL);

        Self::new(repo_url, install_dir, cache_root, PROJECT_NAME)
    }

    /// Git URL of the source repository.
    #[must_use]
    pub fn repo_url(&self) -> &str {
        &self.repo_url
    }

    /// Directory receiving the installed binary.
    #[must_use]
    pub fn install_dir(&self) -> &Utf8Path {
        &self.install_dir
    }

    /// Root of the user cache; parent of [`cache_dir`](Self::cache_dir).
    #[must_use]
    pub fn cache_root(&self) -> &Utf8Path {
        &self.cache_root
    }

    /// Persistent project directory holding the checkout and build output.
    #[must_use]
    pub fn cache_dir(&self) -> Utf8PathBuf {
        self.cache_root.join(&self.project_name)
    }

    /// Sibling of [`cache_dir`](Self::cache_dir) that clones are written to
    /// before being moved into place.
    #[must_use]
    pub fn clone_staging_dir(&self) -> Utf8PathBuf {
        self.cache_root.join(format!(".{}.partial", self.project_name))
    }

    /// Project, package, and binary name.
    #[must_use]
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Fixed cargo target directory inside the cache.
    #[must_use]
    pub fn target_dir(&self) -> Utf8PathBuf {
        self.cache_dir().join(BUILD_OUTPUT_DIR)
    }

    /// Path at which a successful release build leaves the executable.
    #[must_use]
    pub fn artifact_path(&self) -> Utf8PathBuf {
        self.target_dir().join("release").join(self.binary_file_name())
    }

    /// Final location of the installed executable.
    #[must_use]
    pub fn installed_path(&self) -> Utf8PathBuf {
        self.install_dir.join(self.binary_file_name())
    }

    fn binary_file_name(&self) -> String {
        format!("{}{}", self.project_name, std::env::consts::EXE_SUFFIX)
    }
}

fn utf8_dir(dir: Option<PathBuf>, kind: &str) -> Result<Utf8PathBuf> {
    let dir = dir.ok_or_else(|| invalid(format!("could not determine the {kind} directory")))?;
    Utf8PathBuf::try_from(dir)
        .map_err(|e| invalid(format!("{kind} directory is not valid UTF-8: {e}")))
}

fn require_absolute(what: &str, path: &Utf8Path) -> Result<()> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(invalid(format!("{what} {path} must be an absolute path")))
    }
}

fn invalid(reason: impl Into<String>) -> InstallerError {
    InstallerError::InvalidConfig {
        reason: reason.into(),
    }
}
