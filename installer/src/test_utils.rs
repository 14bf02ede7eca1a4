//! Shared test utilities for the installer crate.

use crate::cancel::CancellationToken;
use crate::error::{InstallerError, Result};
use crate::process::{CommandExecutor, CommandSpec};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    stdout_output("")
}

/// Creates a successful command `Output` with the given stdout.
#[must_use]
pub fn stdout_output(stdout: &str) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

type Effect = Box<dyn FnOnce()>;

/// Represents an expected command invocation for testing.
pub struct ExpectedCall {
    /// The command to execute (e.g., "git").
    pub cmd: String,
    /// The arguments to pass to the command.
    pub args: Vec<String>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
    effect: Option<Effect>,
}

impl ExpectedCall {
    /// Expect `cmd args...` and answer with `result`.
    #[must_use]
    pub fn new(cmd: &str, args: &[&str], result: Result<Output>) -> Self {
        Self {
            cmd: cmd.to_owned(),
            args: args.iter().map(|&arg| arg.to_owned()).collect(),
            result,
            effect: None,
        }
    }

    /// Run `effect` when the call is consumed, e.g. to create the files a
    /// real clone or build would leave behind.
    #[must_use]
    pub fn with_effect(mut self, effect: impl FnOnce() + 'static) -> Self {
        self.effect = Some(Box::new(effect));
        self
    }
}

impl fmt::Debug for ExpectedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpectedCall")
            .field("cmd", &self.cmd)
            .field("args", &self.args)
            .field("result", &self.result)
            .field("has_effect", &self.effect.is_some())
            .finish()
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects.
/// Unexpected or mismatched invocations produce
/// [`InstallerError::StubMismatch`] so the failure surfaces through the code
/// under test.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
    invoked: RefCell<Vec<String>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            invoked: RefCell::new(Vec::new()),
        }
    }

    /// Command lines received so far, in order.
    #[must_use]
    pub fn invocations(&self) -> Vec<String> {
        self.invoked.borrow().clone()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        let remaining = self.expected.borrow();
        assert!(
            remaining.is_empty(),
            "expected no further command invocations, {} remain: {:?}",
            remaining.len(),
            remaining.front()
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, spec: &CommandSpec, cancel: &CancellationToken) -> Result<Output> {
        self.invoked.borrow_mut().push(spec.to_string());

        if cancel.is_cancelled() {
            return Err(InstallerError::Interrupted);
        }

        let call = self.expected.borrow_mut().pop_front().ok_or_else(|| {
            InstallerError::StubMismatch {
                message: format!("unexpected command invocation `{spec}`"),
            }
        })?;

        if call.cmd != spec.program || call.args != spec.args {
            return Err(InstallerError::StubMismatch {
                message: format!(
                    "expected `{} {}`, received `{spec}`",
                    call.cmd,
                    call.args.join(" ")
                ),
            });
        }

        if let Some(effect) = call.effect {
            effect();
        }
        call.result
    }
}
