//! Error types for the skatos installer.
//!
//! This module defines one semantic variant per pipeline failure so that the
//! orchestrator can report a stage-specific message before exiting. Each
//! variant carries the context a user needs to recover.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur during the installation process.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The resolved configuration violates an invariant (e.g. a relative path).
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the violated invariant.
        reason: String,
    },

    /// A tool the pipeline cannot run without is not on the search path.
    #[error("required tool `{tool}` was not found on PATH; {hint}")]
    MissingHardDependency {
        /// Name of the missing tool.
        tool: &'static str,
        /// Installation hint for the tool.
        hint: &'static str,
    },

    /// A directory the pipeline needs could not be created.
    #[error("failed to create directory {path}")]
    Provisioning {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// The underlying filesystem error.
        #[source]
        source: std::io::Error,
    },

    /// Cloning, updating, or repairing the source checkout failed.
    #[error("git {operation} failed: {message}")]
    SourceSync {
        /// The git operation that failed (clone, pull, etc.).
        operation: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// The release build could not be started or exited unsuccessfully.
    #[error("cargo build failed: {reason}")]
    Build {
        /// Description of the build failure.
        reason: String,
    },

    /// The build reported success but the artifact is not where expected.
    #[error("build artifact not found at {path}; the build output layout does not match")]
    ArtifactNotFound {
        /// Path at which the artifact was expected.
        path: Utf8PathBuf,
    },

    /// Copying the artifact into the install directory failed.
    #[error("failed to install binary to {path}: {reason}")]
    Install {
        /// Destination path of the binary.
        path: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// The installed binary is missing or not executable.
    #[error("verification failed for {path}: {reason}")]
    Verification {
        /// Path of the installed binary.
        path: Utf8PathBuf,
        /// Why verification failed.
        reason: String,
    },

    /// An interrupt or termination signal cancelled the run.
    #[error("installation interrupted")]
    Interrupted,

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl InstallerError {
    /// Returns `true` when the error was caused by cancellation.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_hard_dependency_names_tool_and_hint() {
        let err = InstallerError::MissingHardDependency {
            tool: "git",
            hint: "install it with your system package manager",
        };
        let msg = err.to_string();
        assert!(msg.contains("`git`"));
        assert!(msg.contains("package manager"));
    }

    #[test]
    fn source_sync_error_includes_operation_and_message() {
        let err = InstallerError::SourceSync {
            operation: "pull",
            message: "fatal: Not possible to fast-forward, aborting.".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("pull"));
        assert!(msg.contains("fast-forward"));
    }

    #[test]
    fn artifact_not_found_is_distinct_from_build_failure() {
        let err = InstallerError::ArtifactNotFound {
            path: Utf8PathBuf::from("/cache/skatos/target/release/skatos"),
        };
        let msg = err.to_string();
        assert!(msg.contains("artifact not found"));
        assert!(msg.contains("/cache/skatos/target/release/skatos"));
        assert!(!msg.contains("cargo build failed"));
    }

    #[test]
    fn provisioning_error_preserves_source() {
        let err = InstallerError::Provisioning {
            path: Utf8PathBuf::from("/readonly/bin"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().contains("/readonly/bin"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn only_interrupted_reports_cancellation() {
        assert!(InstallerError::Interrupted.is_interrupted());
        let other = InstallerError::InvalidConfig {
            reason: "relative path".to_owned(),
        };
        assert!(!other.is_interrupted());
    }
}
