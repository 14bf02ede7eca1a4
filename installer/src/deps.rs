//! Host tool dependency checks.
//!
//! `git` and `cargo` are hard prerequisites: nothing downstream can succeed
//! without them. `skate` is only needed by skatos at run time, so its absence
//! is reported as a warning and the installation proceeds.

use crate::cancel::CancellationToken;
use crate::error::{InstallerError, Result};
use crate::process::{CommandExecutor, CommandSpec};
use log::debug;
use std::fmt;

/// Whether a missing tool stops the installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Missing tool aborts the pipeline.
    Hard,
    /// Missing tool produces a warning only.
    Soft,
}

/// An external tool the installer probes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tool {
    /// Executable name looked up on `PATH`.
    pub name: &'static str,
    /// Whether the tool is required at install time.
    pub requirement: Requirement,
    /// How to obtain the tool.
    pub hint: &'static str,
}

/// Tools probed before any other stage runs, in probe order.
pub const REQUIRED_TOOLS: &[Tool] = &[
    Tool {
        name: "git",
        requirement: Requirement::Hard,
        hint: "install git with your system package manager",
    },
    Tool {
        name: "cargo",
        requirement: Requirement::Hard,
        hint: "install the Rust toolchain from https://rustup.rs",
    },
    Tool {
        name: "skate",
        requirement: Requirement::Soft,
        hint: "skatos needs it at run time; see https://github.com/charmbracelet/skate",
    },
];

/// A tool that could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingTool(pub Tool);

impl fmt::Display for MissingTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.requirement {
            Requirement::Hard => write!(f, "required tool `{}` is missing", self.0.name),
            Requirement::Soft => write!(
                f,
                "optional tool `{}` is missing; {}",
                self.0.name, self.0.hint
            ),
        }
    }
}

/// Outcome of probing every tool in a list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyReport {
    missing: Vec<MissingTool>,
}

impl DependencyReport {
    /// Returns `true` if every tool was found.
    ///
    /// # Examples
    ///
    /// ```
    /// use skatos_installer::deps::DependencyReport;
    ///
    /// assert!(DependencyReport::default().all_present());
    /// ```
    #[must_use]
    pub fn all_present(&self) -> bool {
        self.missing.is_empty()
    }

    /// Missing tools whose absence is only a warning.
    pub fn warnings(&self) -> impl Iterator<Item = &MissingTool> {
        self.missing
            .iter()
            .filter(|m| m.0.requirement == Requirement::Soft)
    }

    /// Convert the report into an error for the first missing hard tool.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::MissingHardDependency`] if any hard
    /// prerequisite is missing.
    pub fn require_hard(&self) -> Result<()> {
        match self
            .missing
            .iter()
            .find(|m| m.0.requirement == Requirement::Hard)
        {
            Some(MissingTool(tool)) => Err(InstallerError::MissingHardDependency {
                tool: tool.name,
                hint: tool.hint,
            }),
            None => Ok(()),
        }
    }
}

/// Probe each tool by running `<tool> --version`.
///
/// A tool counts as present when the probe spawns and exits successfully.
///
/// # Errors
///
/// Only cancellation is propagated; every other probe failure marks the tool
/// as missing.
pub fn check_tools(
    executor: &dyn CommandExecutor,
    tools: &[Tool],
    cancel: &CancellationToken,
) -> Result<DependencyReport> {
    let mut missing = Vec::new();

    for tool in tools {
        let probe = CommandSpec::new(tool.name).args(["--version"]);
        let found = match executor.run(&probe, cancel) {
            Ok(output) => output.status.success(),
            Err(InstallerError::Interrupted) => return Err(InstallerError::Interrupted),
            Err(err) => {
                debug!("probe for `{}` failed: {err}", tool.name);
                false
            }
        };

        if !found {
            missing.push(MissingTool(*tool));
        }
    }

    Ok(DependencyReport { missing })
}
