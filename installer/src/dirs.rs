//! Directory resolution abstraction for platform-specific paths.
//!
//! The installer needs the user's cache and binary directories. They
//! are resolved through the [`BaseDirs`] trait so configuration can be tested
//! without touching the real home directory.

use std::path::PathBuf;

/// Source of platform directories.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// Directory for user-local executables (`~/.local/bin` on Unix).
    fn bin_dir(&self) -> Option<PathBuf>;

    /// Root of the per-user cache (`~/.cache` on Linux).
    fn cache_dir(&self) -> Option<PathBuf>;
}

/// [`BaseDirs`] backed by `directories-next`.
#[derive(Debug, Clone)]
pub struct SystemBaseDirs {
    inner: directories_next::BaseDirs,
}

impl SystemBaseDirs {
    /// Resolve directories for the current user.
    ///
    /// Returns `None` if no home directory can be determined.
    #[must_use]
    pub fn new() -> Option<Self> {
        directories_next::BaseDirs::new().map(|inner| Self { inner })
    }
}

impl BaseDirs for SystemBaseDirs {
    fn bin_dir(&self) -> Option<PathBuf> {
        #[cfg(unix)]
        {
            Some(self.inner.home_dir().join(".local").join("bin"))
        }
        #[cfg(windows)]
        {
            Some(self.inner.data_local_dir().join("skatos").join("bin"))
        }
        #[cfg(not(any(unix, windows)))]
        {
            None
        }
    }

    fn cache_dir(&self) -> Option<PathBuf> {
        Some(self.inner.cache_dir().to_path_buf())
    }
}
