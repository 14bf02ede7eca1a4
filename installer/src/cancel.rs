//! Cancellation token and signal listener.
//!
//! The pipeline never terminates the process from inside a signal handler.
//! Instead a background listener flips a shared [`CancellationToken`] when an
//! interrupt or termination signal arrives, and every stage checks the token
//! between steps and while waiting on subprocesses.

use crate::error::Result;
use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared, cloneable flag recording that the run should stop.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the token as cancelled. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Which signal cancelled the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT or Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interrupt => write!(f, "interrupt"),
            Self::Terminate => write!(f, "termination"),
        }
    }
}

/// Start a background thread that cancels `token` on SIGINT or SIGTERM.
///
/// Signal dispositions are registered before this function returns, so a
/// signal delivered immediately afterwards is observed through the token
/// rather than killing the process outright.
///
/// # Errors
///
/// Returns an error if the signal runtime or listener thread cannot be
/// created.
pub fn install_signal_listener(token: CancellationToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    #[cfg(unix)]
    let listener = {
        use tokio::signal::unix::{SignalKind, signal};

        let _guard = runtime.enter();
        let interrupt = signal(SignalKind::interrupt())?;
        let terminate = signal(SignalKind::terminate())?;
        (interrupt, terminate)
    };

    std::thread::Builder::new()
        .name("signal-listener".to_owned())
        .spawn(move || {
            #[cfg(unix)]
            let received = runtime.block_on(wait_for_unix_signal(listener));
            #[cfg(not(unix))]
            let received = runtime.block_on(wait_for_ctrl_c());

            match received {
                Some(signal) => {
                    debug!("received {signal} signal; cancelling installation");
                    token.cancel();
                }
                None => warn!("signal listener stopped without receiving a signal"),
            }
        })?;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_unix_signal(
    (mut interrupt, mut terminate): (tokio::signal::unix::Signal, tokio::signal::unix::Signal),
) -> Option<ShutdownSignal> {
    tokio::select! {
        received = interrupt.recv() => received.map(|()| ShutdownSignal::Interrupt),
        received = terminate.recv() => received.map(|()| ShutdownSignal::Terminate),
    }
}

#[cfg(not(unix))]
async fn wait_for_ctrl_c() -> Option<ShutdownSignal> {
    tokio::signal::ctrl_c()
        .await
        .ok()
        .map(|()| ShutdownSignal::Interrupt)
}
