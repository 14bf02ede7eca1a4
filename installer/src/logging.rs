//! Diagnostic logging setup.
//!
//! The crate logs through the `log` facade. `tracing-subscriber` formats the
//! records to stderr; its `tracing-log` bridge forwards `log` records.

use tracing_subscriber::filter::LevelFilter;

/// Map CLI verbosity flags to a level filter.
///
/// Warnings are shown by default; `-v` adds debug and `-vv` trace output,
/// while `--quiet` restricts output to errors.
#[must_use]
pub fn level_for(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the stderr subscriber at the given level.
///
/// Only the first call takes effect.
pub fn init(level: LevelFilter) {
    let installed = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
    if let Err(err) = installed {
        log::debug!("logger already installed: {err}");
    }
}
