//! skatos installer library.
//!
//! This crate clones or updates the skatos sources in a persistent cache,
//! builds them with incremental compilation, and installs the resulting
//! binary for the current user. It is used by the `skatos-installer` CLI
//! binary and can be driven programmatically for testing.
//!
//! # Modules
//!
//! - [`builder`] - Release build of the cached checkout
//! - [`cancel`] - Cancellation token and signal listener
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Validated, immutable installer configuration
//! - [`deps`] - Host tool dependency checks
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Semantic error types with recovery hints
//! - [`git`] - Cloning, updating, and repairing the cached checkout
//! - [`install`] - Atomic copy of the artifact into the install directory
//! - [`logging`] - Stderr subscriber for diagnostic logging
//! - [`output`] - User-facing progress and dry-run text
//! - [`path_advice`] - Guidance when the install directory is not on `PATH`
//! - [`pipeline`] - Stage ordering, state tracking, and exit codes
//! - [`process`] - Cancellable subprocess execution
//! - [`provision`] - Creation of the install and cache directories
//! - [`repository`] - Classification of the cache directory
//! - [`verify`] - Post-install checks on the installed binary

pub mod builder;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod deps;
pub mod dirs;
pub mod error;
pub mod git;
pub mod install;
pub mod logging;
pub mod output;
pub mod path_advice;
pub mod pipeline;
pub mod process;
pub mod provision;
pub mod repository;
pub mod verify;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
