//! Git operations for cloning and updating the skatos checkout.
//!
//! The checkout lives in the persistent cache directory. An absent cache is
//! cloned, a versioned one is fast-forwarded, and anything else is replaced
//! by a fresh clone. A checkout whose `origin` is not the configured
//! repository is replaced too. Diverged history is never merged or reset:
//! a pull that cannot fast-forward fails the run.

use crate::cancel::CancellationToken;
use crate::config::InstallConfig;
use crate::error::{InstallerError, Result};
use crate::process::{CommandExecutor, CommandSpec, stderr_message};
use crate::repository::{RepositoryState, inspect};
use camino::Utf8Path;
use log::{debug, warn};
use std::fmt;

/// What synchronisation did to the checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The cache was empty and the repository was cloned.
    Cloned,
    /// The cache was unusable, so it was deleted and cloned again.
    Recloned,
    /// The pull found nothing new.
    UpToDate {
        /// Commit checked out.
        head: String,
    },
    /// The pull fast-forwarded to a new commit.
    Updated {
        /// Commit before the pull.
        from: String,
        /// Commit after the pull.
        to: String,
    },
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cloned => write!(f, "cloned fresh copy"),
            Self::Recloned => write!(f, "replaced corrupted cache with a fresh clone"),
            Self::UpToDate { head } => write!(f, "already up to date at {}", short(head)),
            Self::Updated { from, to } => {
                write!(f, "updated {}..{}", short(from), short(to))
            }
        }
    }
}

fn short(commit: &str) -> &str {
    commit.get(..12).unwrap_or(commit)
}

/// Keeps the cached checkout in step with the upstream repository.
pub struct SourceSynchronizer<'a> {
    config: &'a InstallConfig,
    executor: &'a dyn CommandExecutor,
}

impl<'a> SourceSynchronizer<'a> {
    /// Create a synchroniser for the configured cache directory.
    #[must_use]
    pub fn new(config: &'a InstallConfig, executor: &'a dyn CommandExecutor) -> Self {
        Self { config, executor }
    }

    /// Bring the cache directory to an up-to-date checkout.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::SourceSync`] if git fails (network,
    /// authentication, or a pull that cannot fast-forward), or
    /// [`InstallerError::Interrupted`] on cancellation.
    pub fn sync(&self, cancel: &CancellationToken) -> Result<SyncOutcome> {
        let dir = self.config.cache_dir();
        let state = inspect(&dir);
        debug!("cache directory {dir} is {state}");

        match state {
            RepositoryState::Absent => {
                self.clone_into(&dir, cancel)?;
                Ok(SyncOutcome::Cloned)
            }
            RepositoryState::Corrupted => {
                self.clone_into(&dir, cancel)?;
                Ok(SyncOutcome::Recloned)
            }
            RepositoryState::Versioned => self.update(&dir, cancel),
        }
    }

    fn update(&self, dir: &Utf8Path, cancel: &CancellationToken) -> Result<SyncOutcome> {
        let before = match self.head(dir, cancel) {
            Ok(head) => head,
            Err(InstallerError::Interrupted) => return Err(InstallerError::Interrupted),
            Err(err) => {
                // A damaged `.git` may have no resolvable HEAD.
                warn!("cached checkout at {dir} is unusable ({err}); re-cloning");
                self.clone_into(dir, cancel)?;
                return Ok(SyncOutcome::Recloned);
            }
        };

        if let Some(reason) = self.remote_mismatch(dir, cancel)? {
            warn!("cached checkout at {dir} {reason}; re-cloning");
            self.clone_into(dir, cancel)?;
            return Ok(SyncOutcome::Recloned);
        }

        self.git(
            "pull",
            CommandSpec::new("git")
                .args(["pull", "--ff-only"])
                .current_dir(dir),
            cancel,
        )?;

        let after = self.head(dir, cancel)?;
        if before == after {
            Ok(SyncOutcome::UpToDate { head: after })
        } else {
            Ok(SyncOutcome::Updated {
                from: before,
                to: after,
            })
        }
    }

    /// Clone into the staging directory, then move the finished checkout
    /// onto `dir`. A `.git` at `dir` therefore always belongs to a clone that
    /// git completed; an interrupted clone only ever leaves the staging
    /// directory behind, which the next clone clears.
    fn clone_into(&self, dir: &Utf8Path, cancel: &CancellationToken) -> Result<()> {
        let staging = self.config.clone_staging_dir();
        prepare_staging(&staging).map_err(|e| InstallerError::SourceSync {
            operation: "clone",
            message: format!("could not prepare {staging}: {e}"),
        })?;

        let cloned = self.git(
            "clone",
            CommandSpec::new("git").args([
                "clone",
                "--",
                self.config.repo_url(),
                staging.as_str(),
            ]),
            cancel,
        );
        if let Err(err) = cloned {
            discard(&staging);
            return Err(err);
        }

        if dir.symlink_metadata().is_ok() {
            remove_path(dir).map_err(|e| InstallerError::SourceSync {
                operation: "recreate",
                message: format!("could not remove {dir}: {e}"),
            })?;
        }
        std::fs::rename(&staging, dir).map_err(|e| InstallerError::SourceSync {
            operation: "clone",
            message: format!("could not move {staging} to {dir}: {e}"),
        })
    }

    /// Why the checkout's `origin` is not the configured repository, if it
    /// is not.
    fn remote_mismatch(
        &self,
        dir: &Utf8Path,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let expected = self.config.repo_url();
        let output = self.git(
            "remote",
            CommandSpec::new("git")
                .args(["remote", "get-url", "origin"])
                .current_dir(dir),
            cancel,
        );
        match output {
            Ok(output) => {
                let origin = String::from_utf8_lossy(&output.stdout).trim().to_owned();
                if same_remote(&origin, expected) {
                    Ok(None)
                } else {
                    Ok(Some(format!("tracks {origin} instead of {expected}")))
                }
            }
            Err(InstallerError::Interrupted) => Err(InstallerError::Interrupted),
            Err(err) => Ok(Some(format!("has no usable origin ({err})"))),
        }
    }

    fn head(&self, dir: &Utf8Path, cancel: &CancellationToken) -> Result<String> {
        let output = self.git(
            "rev-parse",
            CommandSpec::new("git")
                .args(["rev-parse", "HEAD"])
                .current_dir(dir),
            cancel,
        )?;
        let head = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        if head.is_empty() {
            return Err(InstallerError::SourceSync {
                operation: "rev-parse",
                message: "git reported an empty HEAD".to_owned(),
            });
        }
        Ok(head)
    }

    /// Runs git with prompting disabled and maps failure to `SourceSync`.
    fn git(
        &self,
        operation: &'static str,
        spec: CommandSpec,
        cancel: &CancellationToken,
    ) -> Result<std::process::Output> {
        let spec = spec.env("GIT_TERMINAL_PROMPT", "0");
        let output = match self.executor.run(&spec, cancel) {
            Ok(output) => output,
            Err(InstallerError::Interrupted) => return Err(InstallerError::Interrupted),
            Err(err) => {
                return Err(InstallerError::SourceSync {
                    operation,
                    message: err.to_string(),
                });
            }
        };

        if !output.status.success() {
            return Err(InstallerError::SourceSync {
                operation,
                message: stderr_message(&output),
            });
        }

        Ok(output)
    }
}

fn same_remote(origin: &str, expected: &str) -> bool {
    origin.trim_end_matches('/') == expected.trim_end_matches('/')
}

fn prepare_staging(staging: &Utf8Path) -> std::io::Result<()> {
    if staging.symlink_metadata().is_ok() {
        debug!("removing leftover clone at {staging}");
        remove_path(staging)?;
    }
    match staging.parent() {
        Some(parent) => std::fs::create_dir_all(parent),
        None => Ok(()),
    }
}

fn discard(staging: &Utf8Path) {
    if staging.symlink_metadata().is_err() {
        return;
    }
    if let Err(err) = remove_path(staging) {
        debug!("could not remove partial clone at {staging}: {err}");
    }
}

fn remove_path(path: &Utf8Path) -> std::io::Result<()> {
    if path.symlink_metadata()?.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

#[cfg(test)]
mod tests;
