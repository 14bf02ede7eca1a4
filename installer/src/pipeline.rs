//! Installation pipeline orchestration.
//!
//! The [`Orchestrator`] runs the stages strictly in order, stopping at the
//! first fatal error. Progress is tracked through [`PipelineState`], whose
//! transitions only allow moving to the next stage, finishing, or aborting
//! the current stage. Nothing is rolled back on abort: the cache keeps
//! whatever the interrupted stage left, and the next run repairs it.

use crate::builder::{BuildConfig, Builder};
use crate::cancel::CancellationToken;
use crate::config::InstallConfig;
use crate::deps::{DependencyReport, MissingTool, REQUIRED_TOOLS, Tool, check_tools};
use crate::error::{InstallerError, Result};
use crate::git::{SourceSynchronizer, SyncOutcome};
use crate::install::Installer;
use crate::output::write_stderr_line;
use crate::path_advice::{PathAdvice, advise};
use crate::process::CommandExecutor;
use crate::provision::provision_directories;
use crate::verify::{probe_version, verify_installed};
use camino::Utf8PathBuf;
use log::debug;
use std::ffi::OsString;
use std::fmt;
use std::io::Write;
use thiserror::Error;

/// A step of the installation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Probe for required host tools.
    CheckDeps,
    /// Create the install and cache directories.
    Provision,
    /// Clone, update, or repair the cached checkout.
    Sync,
    /// Release build of the checkout.
    Build,
    /// Copy the artifact into the install directory.
    Install,
    /// Search-path advice. Never fails.
    Advise,
    /// Confirm the installed binary is usable.
    Verify,
}

impl Stage {
    /// The stage that follows this one, or `None` after [`Stage::Verify`].
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::CheckDeps => Some(Self::Provision),
            Self::Provision => Some(Self::Sync),
            Self::Sync => Some(Self::Build),
            Self::Build => Some(Self::Install),
            Self::Install => Some(Self::Advise),
            Self::Advise => Some(Self::Verify),
            Self::Verify => None,
        }
    }

    /// Whether the pipeline may abort while in this stage.
    #[must_use]
    pub fn can_abort(self) -> bool {
        self != Self::Advise
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CheckDeps => "dependency check",
            Self::Provision => "directory provisioning",
            Self::Sync => "source sync",
            Self::Build => "build",
            Self::Install => "install",
            Self::Advise => "path advice",
            Self::Verify => "verification",
        };
        f.write_str(label)
    }
}

/// Where a pipeline run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Executing the given stage.
    Running(Stage),
    /// Every stage succeeded.
    Done,
    /// The given stage failed; absorbing.
    Aborted {
        /// Stage that failed.
        stage: Stage,
    },
}

impl PipelineState {
    /// Initial state of every run.
    pub const START: Self = Self::Running(Stage::CheckDeps);

    /// Move to the next stage, or to [`PipelineState::Done`] after the last.
    ///
    /// Returns `None` from a terminal state.
    #[must_use]
    pub fn advance(self) -> Option<Self> {
        match self {
            Self::Running(stage) => Some(stage.next().map_or(Self::Done, Self::Running)),
            Self::Done | Self::Aborted { .. } => None,
        }
    }

    /// Abort the current stage.
    ///
    /// Returns `None` from a terminal state or from a stage that cannot abort.
    #[must_use]
    pub fn abort(self) -> Option<Self> {
        match self {
            Self::Running(stage) if stage.can_abort() => Some(Self::Aborted { stage }),
            _ => None,
        }
    }

    /// Returns `true` for [`PipelineState::Done`] and [`PipelineState::Aborted`].
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running(_))
    }
}

/// A fatal stage failure.
#[derive(Debug, Error)]
#[error("{stage} failed: {error}")]
pub struct Abort {
    /// Stage that failed.
    pub stage: Stage,
    /// Cause of the failure.
    #[source]
    pub error: InstallerError,
}

/// What a successful run produced.
#[derive(Debug)]
pub struct InstallSummary {
    /// Location of the installed binary.
    pub installed_path: Utf8PathBuf,
    /// What happened to the cached checkout.
    pub sync: SyncOutcome,
    /// Whether the install directory is on `PATH`.
    pub path_advice: PathAdvice,
    /// First line of `--version` output, when the probe succeeded.
    pub version: Option<String>,
    /// Optional tools that were not found.
    pub missing_optional: Vec<MissingTool>,
}

/// The result of [`Orchestrator::run`].
#[derive(Debug)]
pub struct PipelineRun {
    /// Every state the run passed through, starting with [`PipelineState::START`].
    pub history: Vec<PipelineState>,
    /// The summary on success, or the failed stage and its error.
    pub outcome: std::result::Result<InstallSummary, Abort>,
}

/// Exit status for a completed run.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit status for a fatal stage failure or invalid configuration.
pub const EXIT_FAILURE: i32 = 1;
/// Exit status after SIGINT or SIGTERM (128 + SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;

impl PipelineRun {
    /// The state the run ended in.
    #[must_use]
    pub fn final_state(&self) -> PipelineState {
        self.history.last().copied().unwrap_or(PipelineState::START)
    }

    /// Process exit code for this run.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match &self.outcome {
            Ok(_) => EXIT_SUCCESS,
            Err(abort) if abort.error.is_interrupted() => EXIT_INTERRUPTED,
            Err(_) => EXIT_FAILURE,
        }
    }
}

/// Environment values the path advice is computed from.
#[derive(Debug, Clone, Default)]
pub struct SearchEnvironment {
    /// Raw `PATH` value.
    pub path: Option<OsString>,
    /// Raw `SHELL` value.
    pub shell: Option<OsString>,
}

impl SearchEnvironment {
    /// Snapshot `PATH` and `SHELL` from the current process.
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            path: std::env::var_os("PATH"),
            shell: std::env::var_os("SHELL"),
        }
    }
}

/// Drives the installation pipeline.
pub struct Orchestrator<'a> {
    config: &'a InstallConfig,
    executor: &'a dyn CommandExecutor,
    tools: &'a [Tool],
    environment: SearchEnvironment,
    verbosity: u8,
    quiet: bool,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator reading `PATH` and `SHELL` from the process.
    #[must_use]
    pub fn new(config: &'a InstallConfig, executor: &'a dyn CommandExecutor) -> Self {
        Self {
            config,
            executor,
            tools: REQUIRED_TOOLS,
            environment: SearchEnvironment::from_process(),
            verbosity: 0,
            quiet: false,
        }
    }

    /// Use an explicit search environment instead of the process one.
    #[must_use]
    pub fn with_environment(mut self, environment: SearchEnvironment) -> Self {
        self.environment = environment;
        self
    }

    /// Probe `tools` instead of the default tool list.
    #[must_use]
    pub fn with_tools(mut self, tools: &'a [Tool]) -> Self {
        self.tools = tools;
        self
    }

    /// Forward `verbosity` to cargo.
    #[must_use]
    pub fn verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Suppress progress output.
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Run every stage in order.
    ///
    /// The cancellation token is checked before each stage that can abort
    /// and polled by running subprocesses.
    pub fn run(&self, cancel: &CancellationToken, stderr: &mut dyn Write) -> PipelineRun {
        let mut tracker = Tracker::new();
        let outcome = self.execute(&mut tracker, cancel, stderr);
        PipelineRun {
            history: tracker.history,
            outcome,
        }
    }

    fn execute(
        &self,
        tracker: &mut Tracker,
        cancel: &CancellationToken,
        stderr: &mut dyn Write,
    ) -> std::result::Result<InstallSummary, Abort> {
        let report = tracker.step(cancel, || self.check_dependencies(cancel, stderr))?;
        tracker.step(cancel, || provision_directories(self.config))?;
        let sync = tracker.step(cancel, || self.sync(cancel, stderr))?;
        tracker.step(cancel, || self.build(cancel, stderr))?;
        let installed_path = tracker.step(cancel, || self.install(stderr))?;
        let path_advice = tracker.advise(|| self.advise_path(stderr));
        let version = tracker.step(cancel, || {
            verify_installed(&installed_path)?;
            probe_version(self.executor, &installed_path, cancel)
        })?;

        Ok(InstallSummary {
            installed_path,
            sync,
            path_advice,
            version,
            missing_optional: report.warnings().copied().collect(),
        })
    }

    fn check_dependencies(
        &self,
        cancel: &CancellationToken,
        stderr: &mut dyn Write,
    ) -> Result<DependencyReport> {
        let report = check_tools(self.executor, self.tools, cancel)?;
        report.require_hard()?;
        for missing in report.warnings() {
            debug!("{missing}");
            if !self.quiet {
                write_stderr_line(stderr, format!("Warning: {missing}"));
            }
        }
        Ok(report)
    }

    fn sync(&self, cancel: &CancellationToken, stderr: &mut dyn Write) -> Result<SyncOutcome> {
        self.progress(
            stderr,
            format!(
                "Synchronising {} in {}...",
                self.config.repo_url(),
                self.config.cache_dir()
            ),
        );
        let outcome = SourceSynchronizer::new(self.config, self.executor).sync(cancel)?;
        self.progress(stderr, format!("Source: {outcome}"));
        Ok(outcome)
    }

    fn build(&self, cancel: &CancellationToken, stderr: &mut dyn Write) -> Result<()> {
        self.progress(
            stderr,
            format!("Building {} (release)...", self.config.project_name()),
        );
        let config = BuildConfig::from_install_config(self.config, self.verbosity);
        Builder::new(config, self.executor).build(cancel)
    }

    fn install(&self, stderr: &mut dyn Write) -> Result<Utf8PathBuf> {
        self.progress(
            stderr,
            format!("Installing to {}...", self.config.installed_path()),
        );
        Installer::from_config(self.config).install()
    }

    fn advise_path(&self, stderr: &mut dyn Write) -> PathAdvice {
        let advice = advise(
            self.config.install_dir(),
            self.environment.path.as_deref(),
            self.environment.shell.as_deref(),
        );
        if let PathAdvice::Missing { guidance } = &advice {
            debug!("{} is not on PATH", self.config.install_dir());
            if !self.quiet {
                write_stderr_line(stderr, "");
                write_stderr_line(stderr, guidance);
                write_stderr_line(stderr, "");
            }
        }
        advice
    }

    fn progress(&self, stderr: &mut dyn Write, message: impl fmt::Display) {
        if !self.quiet {
            write_stderr_line(stderr, message);
        }
    }
}

/// Records state transitions as stages complete or fail.
struct Tracker {
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl Tracker {
    fn new() -> Self {
        Self {
            state: PipelineState::START,
            history: vec![PipelineState::START],
        }
    }

    fn current_stage(&self) -> Stage {
        match self.state {
            PipelineState::Running(stage) | PipelineState::Aborted { stage } => stage,
            PipelineState::Done => Stage::Verify,
        }
    }

    fn step<T>(
        &mut self,
        cancel: &CancellationToken,
        stage_fn: impl FnOnce() -> Result<T>,
    ) -> std::result::Result<T, Abort> {
        let stage = self.current_stage();
        if cancel.is_cancelled() {
            return Err(self.abort(InstallerError::Interrupted));
        }

        debug!("entering stage: {stage}");
        match stage_fn() {
            Ok(value) => {
                self.transition(self.state.advance());
                Ok(value)
            }
            // The child may see a terminal interrupt before the listener
            // flips the token, and then fail like any other stage error.
            Err(error) if cancel.is_cancelled() && !error.is_interrupted() => {
                debug!("{stage} failed after cancellation: {error}");
                Err(self.abort(InstallerError::Interrupted))
            }
            Err(error) => Err(self.abort(error)),
        }
    }

    fn advise<T>(&mut self, stage_fn: impl FnOnce() -> T) -> T {
        debug!("entering stage: {}", self.current_stage());
        let value = stage_fn();
        self.transition(self.state.advance());
        value
    }

    fn abort(&mut self, error: InstallerError) -> Abort {
        let stage = self.current_stage();
        self.transition(self.state.abort());
        Abort { stage, error }
    }

    fn transition(&mut self, next: Option<PipelineState>) {
        debug_assert!(next.is_some(), "invalid transition from {:?}", self.state);
        if let Some(next) = next {
            debug!("pipeline state: {next:?}");
            self.state = next;
            self.history.push(next);
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
