//! Progress tracking and reporting.
//!
//! Progress is reported as [`ProgressEvent`]s: an ordered scope path from the root task down to a
//! single job, a percent-complete value, and a message. Events are delivered to a
//! [`ProgressReporter`]; the default [`LogProgress`] reporter writes them to the log. A
//! [`ProgressTracker`] counts finished units of work from many threads and derives the percentage.

use log::info;
use std::sync::atomic::{AtomicU64, Ordering};

/// A single progress notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Scope identifiers ordered from the root task down to the reporting job.
    pub scope: Vec<String>,
    /// Percent complete, 0 to 100.
    pub percent: u8,
    /// Free-text status message.
    pub message: String,
}

impl ProgressEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(scope: &[String], percent: u8, message: impl Into<String>) -> Self {
        Self { scope: scope.to_vec(), percent: percent.min(100), message: message.into() }
    }
}

/// Consumer of progress events, typically a presentation layer.
///
/// Implementations must be callable from any job thread.
pub trait ProgressReporter: Send + Sync {
    /// Handles one progress event.
    fn report(&self, event: &ProgressEvent);
}

/// Reporter that writes every event to the `log` facade at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, event: &ProgressEvent) {
        info!("[{}] {:>3}% {}", event.scope.join(" > "), event.percent, event.message);
    }
}

/// Thread-safe counter of finished units of work out of a known total.
///
/// # Example
/// ```
/// use fgsweep_lib::progress::ProgressTracker;
///
/// let tracker = ProgressTracker::new("Transient databases", 4);
/// assert_eq!(tracker.increment(), 25);
/// assert_eq!(tracker.increment(), 50);
/// assert_eq!(tracker.count(), 2);
/// ```
pub struct ProgressTracker {
    /// Message prefix for log output.
    message: String,
    /// Number of units expected.
    total: u64,
    /// Internal count of units finished (thread-safe).
    count: AtomicU64,
}

impl ProgressTracker {
    /// Create a new tracker expecting `total` units of work.
    #[must_use]
    pub fn new(message: impl Into<String>, total: u64) -> Self {
        Self { message: message.into(), total, count: AtomicU64::new(0) }
    }

    /// Marks one unit as finished and returns the new percent complete.
    pub fn increment(&self) -> u8 {
        let done = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        Self::percent_of(done, self.total)
    }

    /// Current percent complete.
    #[must_use]
    pub fn percent(&self) -> u8 {
        Self::percent_of(self.count(), self.total)
    }

    /// Number of units finished so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Logs the final count.
    pub fn log_final(&self) {
        info!("{} {}/{} (complete)", self.message, self.count(), self.total);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn percent_of(done: u64, total: u64) -> u8 {
        if total == 0 {
            return 100;
        }
        (done.min(total) * 100 / total) as u8
    }
}
