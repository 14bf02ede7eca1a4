//! On-disk state of the cached source checkout.
//!
//! This is the single place that decides what the cache directory looks
//! like. The synchroniser branches on the returned [`RepositoryState`]
//! instead of scattering existence checks.

use camino::Utf8Path;
use std::fmt;

/// State of the cache directory between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryState {
    /// Nothing exists at the cache path.
    Absent,
    /// A directory with version-control metadata.
    Versioned,
    /// Something exists at the cache path but it is not a usable checkout,
    /// typically the remains of an interrupted clone.
    Corrupted,
}

impl RepositoryState {
    /// The action the synchroniser takes from this state.
    #[must_use]
    pub fn planned_action(self) -> &'static str {
        match self {
            Self::Absent => "clone",
            Self::Versioned => "fast-forward pull",
            Self::Corrupted => "delete and re-clone",
        }
    }
}

impl fmt::Display for RepositoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Versioned => write!(f, "versioned"),
            Self::Corrupted => write!(f, "corrupted"),
        }
    }
}

/// Classify the cache directory.
///
/// A `.git` entry may be a directory or, for worktrees, a file; either counts
/// as version-control metadata.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use skatos_installer::repository::{RepositoryState, inspect};
///
/// let state = inspect(Utf8Path::new("/nonexistent/skatos-cache"));
/// assert_eq!(state, RepositoryState::Absent);
/// ```
#[must_use]
pub fn inspect(dir: &Utf8Path) -> RepositoryState {
    // symlink_metadata so a dangling symlink is seen as something to clear away
    let Ok(metadata) = dir.symlink_metadata() else {
        return RepositoryState::Absent;
    };

    if metadata.is_dir() && dir.join(".git").exists() {
        RepositoryState::Versioned
    } else {
        RepositoryState::Corrupted
    }
}
