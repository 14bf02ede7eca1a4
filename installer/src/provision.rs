//! Directory provisioning.
//!
//! Creates the install directory and the cache root. The project checkout
//! directory under the cache root is left to the synchroniser so that a first
//! run still observes it as absent.

use crate::config::InstallConfig;
use crate::error::{InstallerError, Result};
use camino::Utf8Path;
use log::debug;

/// Ensure the install directory and cache root exist.
///
/// Idempotent: directories that already exist are left untouched.
///
/// # Errors
///
/// Returns [`InstallerError::Provisioning`] naming the directory that could
/// not be created.
pub fn provision_directories(config: &InstallConfig) -> Result<()> {
    ensure_dir(config.install_dir())?;
    ensure_dir(config.cache_root())
}

fn ensure_dir(path: &Utf8Path) -> Result<()> {
    debug!("ensuring directory {path} exists");
    std::fs::create_dir_all(path).map_err(|source| InstallerError::Provisioning {
        path: path.to_owned(),
        source,
    })
}
