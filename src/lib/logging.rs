//! Enhanced logging utilities for formatted output.
//!
//! This module provides consistent, user-friendly logging utilities for metrics,
//! timing, and operation summaries.

use std::time::{Duration, Instant};

use fgsweep_metrics::{TransientSearchMetrics, format_count};

use crate::scheduler::{JobState, RunSummary};

/// Formats a percentage with specified decimal places.
///
/// # Examples
///
/// ```
/// use fgsweep_lib::logging::format_percent;
///
/// assert_eq!(format_percent(0.9543, 2), "95.43%");
/// assert_eq!(format_percent(1.0, 0), "100%");
/// ```
#[must_use]
pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.decimals$}%", value * 100.0, decimals = decimals)
}

/// Formats a duration in human-readable form (e.g., "2m 15s", "1h 30m", "45s").
///
/// # Examples
///
/// ```
/// use fgsweep_lib::logging::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(45)), "45s");
/// assert_eq!(format_duration(Duration::from_secs(135)), "2m 15s");
/// assert_eq!(format_duration(Duration::from_secs(5400)), "1h 30m");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        let mins = secs / 60;
        let remaining_secs = secs % 60;
        if remaining_secs == 0 { format!("{mins}m") } else { format!("{mins}m {remaining_secs}s") }
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins == 0 { format!("{hours}h") } else { format!("{hours}h {mins}m") }
    }
}

/// Fraction of `part` in `whole`, or zero when `whole` is zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn fraction(part: u64, whole: u64) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 }
}

/// Logs a formatted summary of one transient database search.
pub fn log_dataset_summary(metrics: &TransientSearchMetrics) {
    log::info!("Transient database '{}' summary:", metrics.dataset_id);
    log::info!("  Transient proteins: {}", format_count(metrics.transient_proteins));
    log::info!(
        "  PSMs: {} ({} target, {} decoy)",
        format_count(metrics.total_psms),
        format_count(metrics.target_psms),
        format_count(metrics.decoy_psms)
    );
    log::info!(
        "  Confident target PSMs: {} ({} of all PSMs)",
        format_count(metrics.confident_target_psms),
        format_percent(fraction(metrics.confident_target_psms, metrics.total_psms), 2)
    );
    log::info!(
        "  Transient PSMs: {} ({} confident targets)",
        format_count(metrics.transient_psms),
        format_count(metrics.confident_transient_target_psms)
    );
    log::info!(
        "  Peptides: {} ({} confident targets, {} transient)",
        format_count(metrics.total_peptides),
        format_count(metrics.confident_target_peptides),
        format_count(metrics.transient_peptides)
    );
    if metrics.protein_groups > 0 {
        log::info!(
            "  Protein groups: {} ({} confident targets, {} transient)",
            format_count(metrics.protein_groups),
            format_count(metrics.confident_target_protein_groups),
            format_count(metrics.transient_protein_groups)
        );
    }
}

/// Logs the outcome of a whole sweep.
pub fn log_run_summary(summary: &RunSummary) {
    log::info!("Sweep finished in {}", format_duration(summary.elapsed));
    log::info!(
        "  Transient databases: {} completed, {} skipped, {} failed, {} cancelled",
        summary.count(JobState::Completed),
        summary.count(JobState::Skipped),
        summary.count(JobState::Failed),
        summary.count(JobState::Cancelled)
    );
    log::info!("  Results recorded: {}", format_count(summary.cached_results as u64));
    if !summary.writers.failures.is_empty() {
        log::warn!(
            "  {} of {} output files could not be written",
            summary.writers.failures.len(),
            summary.writers.total()
        );
    }
    for outcome in summary.failed() {
        log::warn!(
            "  Failed: {} ({})",
            outcome.dataset_id,
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }
}

/// Operation timing and summary helper.
///
/// # Examples
///
/// ```no_run
/// use fgsweep_lib::logging::OperationTimer;
///
/// let timer = OperationTimer::new("Loading spectra");
/// // ... do work ...
/// timer.log_completion(10_000);
/// ```
pub struct OperationTimer {
    operation: String,
    start_time: Instant,
}

impl OperationTimer {
    /// Creates a new operation timer and logs the start.
    #[must_use]
    pub fn new(operation: &str) -> Self {
        log::info!("{operation} ...");
        Self { operation: operation.to_string(), start_time: Instant::now() }
    }

    /// Time elapsed since the timer was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Logs the completion with an item count.
    pub fn log_completion(&self, count: u64) {
        log::info!(
            "{} completed: {} in {}",
            self.operation,
            format_count(count),
            format_duration(self.elapsed())
        );
    }
}
