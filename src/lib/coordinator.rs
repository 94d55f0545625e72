//! Deferred output writing.
//!
//! Jobs register their output writers with a shared [`WriteCoordinator`] and carry on without
//! waiting. Writers run on the coordinator's own pool. [`WriteCoordinator::join`] is called once,
//! after every job has finished, and blocks until every registered writer has reported back.
//! A failing or panicking writer is recorded and logged; it never affects other writers.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, warn};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::extract_panic_message;

/// Result of one registered writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOutcome {
    /// Dataset the writer belongs to
    pub dataset_id: String,
    /// Short description of what was written
    pub label: String,
    /// `Err` holds the failure or panic message
    pub result: std::result::Result<(), String>,
}

/// Totals reported by [`WriteCoordinator::join`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Writers that finished successfully
    pub completed: usize,
    /// Writers that failed
    pub failures: Vec<WriterOutcome>,
}

impl WriteSummary {
    /// Total writers joined.
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed + self.failures.len()
    }
}

/// Join group for asynchronous output writers.
pub struct WriteCoordinator {
    pool: rayon::ThreadPool,
    sender: Sender<WriterOutcome>,
    receiver: Receiver<WriterOutcome>,
    registered: AtomicUsize,
}

impl WriteCoordinator {
    /// Creates a coordinator whose writers run on `threads` threads.
    ///
    /// # Errors
    /// Returns an error if the thread pool cannot be created.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("fgsweep-writer-{i}"))
            .build()
            .context("Failed to build writer thread pool")?;
        let (sender, receiver) = unbounded();
        Ok(Self { pool, sender, receiver, registered: AtomicUsize::new(0) })
    }

    /// Schedules `work` and returns immediately.
    pub fn register<F>(&self, dataset_id: &str, label: &str, work: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.registered.fetch_add(1, Ordering::SeqCst);
        let sender = self.sender.clone();
        let dataset_id = dataset_id.to_string();
        let label = label.to_string();
        self.pool.spawn(move || {
            let result = match catch_unwind(AssertUnwindSafe(work)) {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(format!("{e:#}")),
                Err(panic_info) => Err(format!("panicked: {}", extract_panic_message(panic_info))),
            };
            // The receiver lives as long as the coordinator, which outlives every writer it joins.
            let _ = sender.send(WriterOutcome { dataset_id, label, result });
        });
    }

    /// Number of writers registered so far.
    #[must_use]
    pub fn registered(&self) -> usize {
        self.registered.load(Ordering::SeqCst)
    }

    /// Blocks until every registered writer has finished.
    #[must_use]
    pub fn join(self) -> WriteSummary {
        let expected = self.registered.load(Ordering::SeqCst);
        drop(self.sender);

        let mut summary = WriteSummary::default();
        for _ in 0..expected {
            let Ok(outcome) = self.receiver.recv() else { break };
            match &outcome.result {
                Ok(()) => {
                    debug!("Wrote {} for '{}'", outcome.label, outcome.dataset_id);
                    summary.completed += 1;
                }
                Err(message) => {
                    warn!(
                        "Failed to write {} for '{}': {message}",
                        outcome.label, outcome.dataset_id
                    );
                    summary.failures.push(outcome);
                }
            }
        }
        summary
    }
}
