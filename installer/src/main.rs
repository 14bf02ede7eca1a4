//! skatos installer CLI entrypoint.
//!
//! This binary fetches, builds, and installs the skatos CLI. Repeat runs
//! reuse the cached checkout and build output, so only changed sources are
//! recompiled.

use clap::Parser;
use log::warn;
use skatos_installer::cancel::{CancellationToken, install_signal_listener};
use skatos_installer::cli::Cli;
use skatos_installer::config::InstallConfig;
use skatos_installer::dirs::SystemBaseDirs;
use skatos_installer::error::{InstallerError, Result};
use skatos_installer::logging;
use skatos_installer::output::{DryRunInfo, success_message, write_stderr_line};
use skatos_installer::pipeline::{EXIT_FAILURE, EXIT_SUCCESS, Orchestrator, PipelineRun};
use skatos_installer::process::SystemCommandExecutor;
use skatos_installer::repository::inspect;
use std::io::Write;

/// What `run` did.
#[derive(Debug)]
enum RunOutcome {
    /// Only printed the plan.
    DryRun,
    /// Ran the pipeline to completion or abort.
    Pipeline(PipelineRun),
}

fn main() {
    let cli = Cli::parse();
    logging::init(logging::level_for(cli.verbosity, cli.quiet));
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, cli.quiet, &mut stderr);
    if exit_code != EXIT_SUCCESS {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<RunOutcome> {
    let dirs = SystemBaseDirs::new().ok_or_else(|| InstallerError::InvalidConfig {
        reason: "could not determine the home directory".to_owned(),
    })?;
    let config = InstallConfig::resolve(cli, &dirs)?;

    // Dry-run mode: show what would be done without side effects
    if cli.dry_run {
        print_dry_run_info(cli, &config, stderr);
        return Ok(RunOutcome::DryRun);
    }

    let cancel = CancellationToken::new();
    if let Err(err) = install_signal_listener(cancel.clone()) {
        warn!("interrupts will terminate immediately: {err}");
    }

    let executor = SystemCommandExecutor;
    let run = Orchestrator::new(&config, &executor)
        .verbosity(cli.verbosity)
        .quiet(cli.quiet)
        .run(&cancel, stderr);
    Ok(RunOutcome::Pipeline(run))
}

fn print_dry_run_info(cli: &Cli, config: &InstallConfig, stderr: &mut dyn Write) {
    let info = DryRunInfo {
        config,
        repository: inspect(&config.cache_dir()),
        verbosity: cli.verbosity,
        quiet: cli.quiet,
    };
    write_stderr_line(stderr, info.display_text());
}

fn exit_code_for_run_result(result: Result<RunOutcome>, quiet: bool, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(RunOutcome::DryRun) => EXIT_SUCCESS,
        Ok(RunOutcome::Pipeline(run)) => {
            report_pipeline_run(&run, quiet, stderr);
            run.exit_code()
        }
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            EXIT_FAILURE
        }
    }
}

fn report_pipeline_run(run: &PipelineRun, quiet: bool, stderr: &mut dyn Write) {
    match &run.outcome {
        Ok(summary) => {
            if !quiet {
                write_stderr_line(stderr, "");
                write_stderr_line(
                    stderr,
                    success_message(&summary.installed_path, summary.version.as_deref()),
                );
            }
        }
        Err(abort) if abort.error.is_interrupted() => {
            write_stderr_line(
                stderr,
                format!(
                    "Installation interrupted during {}; the cache is kept for the next run.",
                    abort.stage
                ),
            );
        }
        Err(abort) => write_stderr_line(stderr, format!("error: {abort}")),
    }
}
