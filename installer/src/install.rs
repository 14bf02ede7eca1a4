//! Copying the build artifact into the install directory.
//!
//! The artifact is first copied into a temporary file beside the destination
//! and then renamed over it, so a half-written binary never appears under the
//! installed name.

use crate::config::InstallConfig;
use crate::error::{InstallerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fs::{self, File};
use std::io;
use tempfile::NamedTempFile;

/// Permission bits for the installed binary (rwxr-xr-x).
#[cfg(unix)]
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Installs a built artifact under its canonical name.
pub struct Installer {
    artifact_path: Utf8PathBuf,
    destination: Utf8PathBuf,
}

impl Installer {
    /// Create an installer for explicit source and destination paths.
    #[must_use]
    pub fn new(artifact_path: Utf8PathBuf, destination: Utf8PathBuf) -> Self {
        Self {
            artifact_path,
            destination,
        }
    }

    /// Create an installer for the configured artifact and install paths.
    #[must_use]
    pub fn from_config(config: &InstallConfig) -> Self {
        Self::new(config.artifact_path(), config.installed_path())
    }

    /// Copy the artifact into place and mark it executable.
    ///
    /// Returns the installed path.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::ArtifactNotFound`] if the build left nothing
    /// at the expected path, or [`InstallerError::Install`] if the copy,
    /// permission change, or final rename fails.
    pub fn install(&self) -> Result<Utf8PathBuf> {
        if !self.artifact_path.is_file() {
            return Err(InstallerError::ArtifactNotFound {
                path: self.artifact_path.clone(),
            });
        }

        let install_dir = self
            .destination
            .parent()
            .ok_or_else(|| self.failure("destination has no parent directory"))?;

        debug!("installing {} to {}", self.artifact_path, self.destination);
        let staged = self
            .stage_copy(install_dir)
            .map_err(|e| self.failure(format!("failed to copy {}: {e}", self.artifact_path)))?;

        staged
            .persist(&self.destination)
            .map_err(|e| self.failure(format!("failed to replace existing binary: {}", e.error)))?;

        Ok(self.destination.clone())
    }

    fn stage_copy(&self, install_dir: &Utf8Path) -> io::Result<NamedTempFile> {
        let mut staged = tempfile::Builder::new()
            .prefix(".skatos-install-")
            .tempfile_in(install_dir)?;
        let mut source = File::open(&self.artifact_path)?;
        io::copy(&mut source, staged.as_file_mut())?;
        staged.as_file().sync_all()?;
        make_executable(staged.path())?;
        Ok(staged)
    }

    fn failure(&self, reason: impl Into<String>) -> InstallerError {
        InstallerError::Install {
            path: self.destination.clone(),
            reason: reason.into(),
        }
    }
}

#[cfg(unix)]
fn make_executable(path: &std::path::Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(EXECUTABLE_MODE))
}

#[cfg(not(unix))]
fn make_executable(path: &std::path::Path) -> io::Result<()> {
    fs::metadata(path).map(|_| ())
}
