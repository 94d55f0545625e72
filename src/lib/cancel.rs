//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is created by the caller of the scheduler and threaded through every
//! job, search, and pipeline call. Nothing is ever preempted: long-running loops poll the token and
//! return early when it has been set.
//!
//! [`cancel_on_interrupt`] connects a token to Ctrl-C (and SIGTERM on unix) for the command line.

use anyhow::Context;
use log::warn;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crate::errors::{Result, SweepError};

/// A cheaply clonable, thread-safe stop signal.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Every clone of this token observes the request.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Returns [`SweepError::Cancelled`] if cancellation was requested.
    ///
    /// # Errors
    /// Returns an error if the token has been cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() { Err(SweepError::Cancelled) } else { Ok(()) }
    }
}

/// Cancels `token` once the future produced by `signal` resolves.
///
/// The future is created and awaited on a dedicated thread running a single-threaded tokio
/// runtime, so it may register OS signal handlers.
///
/// # Errors
/// Returns an error if the thread cannot be spawned.
pub fn cancel_when<F, Fut>(token: &CancellationToken, signal: F) -> anyhow::Result<JoinHandle<()>>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()>,
{
    let token = token.clone();
    thread::Builder::new()
        .name("fgsweep-signal".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!("Failed to start signal runtime; interrupts will not cancel: {e}");
                    return;
                }
            };
            runtime.block_on(signal());
            token.cancel();
        })
        .context("Failed to spawn signal thread")
}

/// Cancels `token` on the first Ctrl-C, or SIGTERM on unix.
///
/// Running jobs stop at their next cancellation check and are retried on the next run.
///
/// # Errors
/// Returns an error if the signal thread cannot be spawned.
pub fn cancel_on_interrupt(token: &CancellationToken) -> anyhow::Result<()> {
    cancel_when(token, || async {
        wait_for_interrupt().await;
        warn!("Interrupt received; stopping running jobs at their next checkpoint");
    })?;
    Ok(())
}

async fn wait_for_interrupt() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to register signal handlers; interrupts will not cancel: {e}");
                std::future::pending::<()>().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to register Ctrl-C handler; interrupts will not cancel: {e}");
            std::future::pending::<()>().await;
        }
    }
}
