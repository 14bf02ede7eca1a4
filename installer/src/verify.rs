//! Post-install verification.
//!
//! [`verify_installed`] is the success oracle: the run only reports success
//! once the binary is present, a regular file, and executable.
//! [`probe_version`] is an additional best-effort smoke test.

use crate::cancel::CancellationToken;
use crate::error::{InstallerError, Result};
use crate::process::{CommandExecutor, CommandSpec, stderr_message};
use camino::Utf8Path;
use log::warn;

/// Confirm the installed binary exists and carries execute permission.
///
/// # Errors
///
/// Returns [`InstallerError::Verification`] describing the first failed check.
pub fn verify_installed(path: &Utf8Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| failure(path, format!("not found: {e}")))?;

    if !metadata.is_file() {
        return Err(failure(path, "not a regular file"));
    }

    check_executable(path, &metadata)
}

#[cfg(unix)]
fn check_executable(path: &Utf8Path, metadata: &std::fs::Metadata) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode();
    if mode & 0o111 == 0o111 {
        Ok(())
    } else {
        Err(failure(
            path,
            format!("missing execute permission (mode {:o})", mode & 0o777),
        ))
    }
}

#[cfg(not(unix))]
fn check_executable(_path: &Utf8Path, _metadata: &std::fs::Metadata) -> Result<()> {
    Ok(())
}

fn failure(path: &Utf8Path, reason: impl Into<String>) -> InstallerError {
    InstallerError::Verification {
        path: path.to_owned(),
        reason: reason.into(),
    }
}

/// Run `<binary> --version` and return the first line it prints.
///
/// Failures are logged as warnings and yield `None`.
///
/// # Errors
///
/// Only [`InstallerError::Interrupted`] is propagated.
pub fn probe_version(
    executor: &dyn CommandExecutor,
    path: &Utf8Path,
    cancel: &CancellationToken,
) -> Result<Option<String>> {
    let spec = CommandSpec::new(path.as_str()).args(["--version"]);
    let output = match executor.run(&spec, cancel) {
        Ok(output) => output,
        Err(InstallerError::Interrupted) => return Err(InstallerError::Interrupted),
        Err(err) => {
            warn!("could not run {path} --version: {err}");
            return Ok(None);
        }
    };

    if !output.status.success() {
        warn!("{path} --version failed: {}", stderr_message(&output));
        return Ok(None);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_owned))
}
