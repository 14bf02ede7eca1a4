//! Cancellable subprocess execution.
//!
//! Every external program the installer runs (git, cargo, the installed
//! binary) goes through the [`CommandExecutor`] seam. The system
//! implementation polls the child with a short wait interval so that a
//! cancelled [`CancellationToken`] kills the subprocess promptly instead of
//! waiting for it to finish.

use crate::cancel::CancellationToken;
use crate::error::{InstallerError, Result};
use camino::Utf8PathBuf;
use log::{debug, trace};
use std::fmt;
use std::io::Read;
use std::process::{Child, Command, Output, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;
use wait_timeout::ChildExt;

/// Interval between cancellation checks while a subprocess runs.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How the child's standard streams are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdioMode {
    /// Capture stdout and stderr into the returned [`Output`].
    Capture,
    /// Pass the installer's own streams through to the child.
    Inherit,
}

/// A fully described subprocess invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to run, resolved through `PATH` unless absolute.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Working directory for the child, if different from the installer's.
    pub current_dir: Option<Utf8PathBuf>,
    /// Extra environment variables for the child.
    pub envs: Vec<(String, String)>,
    /// Stream handling.
    pub stdio: StdioMode,
}

impl CommandSpec {
    /// Create a captured invocation of `program` with no arguments.
    ///
    /// # Examples
    ///
    /// ```
    /// use skatos_installer::process::{CommandSpec, StdioMode};
    ///
    /// let spec = CommandSpec::new("git").args(["pull", "--ff-only"]);
    /// assert_eq!(spec.to_string(), "git pull --ff-only");
    /// assert_eq!(spec.stdio, StdioMode::Capture);
    /// ```
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            envs: Vec::new(),
            stdio: StdioMode::Capture,
        }
    }

    /// Append arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run the child in `dir`.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Set an environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Let the child write straight to the installer's terminal.
    #[must_use]
    pub fn inherit_stdio(mut self) -> Self {
        self.stdio = StdioMode::Inherit;
        self
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir.as_std_path());
        }
        cmd.envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        match self.stdio {
            StdioMode::Capture => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
            }
            StdioMode::Inherit => {
                cmd.stdin(Stdio::null());
            }
        }
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandExecutor {
    /// Runs the command to completion and returns its output.
    ///
    /// Implementations must stop the child and return
    /// [`InstallerError::Interrupted`] once `cancel` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns any I/O error encountered while spawning or waiting for the
    /// command, or `Interrupted` on cancellation. A non-zero exit is not an
    /// error at this level.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use skatos_installer::cancel::CancellationToken;
    /// use skatos_installer::process::{CommandExecutor, CommandSpec, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run(&CommandSpec::new("git").args(["--version"]), &CancellationToken::new())?;
    /// assert!(output.status.success());
    /// # Ok::<(), skatos_installer::error::InstallerError>(())
    /// ```
    fn run(&self, spec: &CommandSpec, cancel: &CancellationToken) -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, spec: &CommandSpec, cancel: &CancellationToken) -> Result<Output> {
        if cancel.is_cancelled() {
            return Err(InstallerError::Interrupted);
        }

        debug!("running `{spec}`");
        let mut child = spec.to_command().spawn()?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = loop {
            if let Some(status) = child.wait_timeout(POLL_INTERVAL)? {
                break status;
            }
            if cancel.is_cancelled() {
                stop_child(&mut child, spec);
                return Err(InstallerError::Interrupted);
            }
        };

        trace!("`{spec}` exited with {status}");
        // Terminal interrupts reach the whole process group, so the child
        // may exit before the loop sees the token.
        if cancel.is_cancelled() {
            return Err(InstallerError::Interrupted);
        }
        Ok(Output {
            status,
            stdout: collect(stdout)?,
            stderr: collect(stderr)?,
        })
    }
}

/// Read a captured stream on its own thread so a chatty child cannot block
/// on a full pipe while the executor polls for exit.
fn drain<R>(stream: Option<R>) -> Option<JoinHandle<std::io::Result<Vec<u8>>>>
where
    R: Read + Send + 'static,
{
    stream.map(|mut reader| {
        std::thread::spawn(move || {
            let mut buffer = Vec::new();
            reader.read_to_end(&mut buffer)?;
            Ok(buffer)
        })
    })
}

fn collect(handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>) -> Result<Vec<u8>> {
    let Some(handle) = handle else {
        return Ok(Vec::new());
    };
    match handle.join() {
        Ok(bytes) => Ok(bytes?),
        Err(_) => Err(InstallerError::Io(std::io::Error::other(
            "output reader thread panicked",
        ))),
    }
}

fn stop_child(child: &mut Child, spec: &CommandSpec) {
    debug!("cancellation requested; stopping `{spec}`");
    if let Err(err) = child.kill() {
        debug!("failed to kill `{spec}`: {err}");
    }
    if let Err(err) = child.wait() {
        debug!("failed to reap `{spec}`: {err}");
    }
}

/// Returns git/cargo style stderr as a single trimmed message.
#[must_use]
pub fn stderr_message(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_owned()
}
