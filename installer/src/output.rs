//! User-facing text for the installer CLI.
//!
//! Progress and result lines are written to an injected writer so that the
//! orchestrator and the binary can be tested against a `Vec<u8>`.

use crate::config::InstallConfig;
use crate::repository::RepositoryState;
use camino::Utf8Path;
use std::fmt::Display;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Format the final success line.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use skatos_installer::output::success_message;
///
/// let msg = success_message(Utf8Path::new("/home/me/.local/bin/skatos"), Some("skatos 1.2.0"));
/// assert_eq!(msg, "Installed skatos 1.2.0 to /home/me/.local/bin/skatos");
/// ```
#[must_use]
pub fn success_message(installed_path: &Utf8Path, version: Option<&str>) -> String {
    match version {
        Some(version) => format!("Installed {version} to {installed_path}"),
        None => format!("Installed {installed_path}"),
    }
}

/// Configuration information for dry-run output.
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// Resolved configuration.
    pub config: &'a InstallConfig,
    /// Current state of the cache directory.
    pub repository: RepositoryState,
    /// Verbosity level (0 = normal, 1+ = verbose).
    pub verbosity: u8,
    /// Whether quiet mode is enabled.
    pub quiet: bool,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let config = self.config;
        [
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Repository: {}", config.repo_url()),
            format!("Cache directory: {}", config.cache_dir()),
            format!("Cache state: {}", self.repository),
            format!("Planned sync: {}", self.repository.planned_action()),
            format!("Build output: {}", config.target_dir()),
            format!("Install path: {}", config.installed_path()),
            format!("Verbosity level: {}", self.verbosity),
            format!("Quiet: {}", self.quiet),
        ]
        .join("\n")
    }
}
