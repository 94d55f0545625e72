//! Run-level outputs: the full results dump and the aggregate text report.

use anyhow::{Context, Result};
use fgsweep_metrics::{TransientSearchMetrics, format_count};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::output::write_counts;

/// Incremental results file, one row per completed dataset.
pub const INCREMENTAL_RESULTS_FILE: &str = "transient_search_results.tsv";
/// Full results dump, ordered by dataset.
pub const ALL_RESULTS_FILE: &str = "all_transient_results.tsv";
/// Aggregate text report.
pub const RUN_SUMMARY_FILE: &str = "run_summary.txt";

/// A dataset whose job did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDataset {
    /// Dataset identifier
    pub dataset_id: String,
    /// Failure message
    pub reason: String,
}

/// Sums `results` into one row labelled `total`.
#[must_use]
pub fn totals(results: &[TransientSearchMetrics]) -> TransientSearchMetrics {
    let mut total = TransientSearchMetrics::new("total");
    for metrics in results {
        total.accumulate(metrics);
    }
    total
}

/// Writes the aggregate report for `results` (every completed dataset) and the datasets that
/// failed in this run.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_run_summary(
    path: &Path,
    results: &[TransientSearchMetrics],
    failed: &[FailedDataset],
    q_value_threshold: f64,
) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_report(&mut writer, results, failed, q_value_threshold)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    writer.flush().with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn write_report(
    writer: &mut impl Write,
    results: &[TransientSearchMetrics],
    failed: &[FailedDataset],
    q_value_threshold: f64,
) -> std::io::Result<()> {
    writeln!(writer, "Transient datasets searched: {}", results.len())?;
    writeln!(writer, "Transient datasets failed: {}", failed.len())?;
    writeln!(writer)?;
    writeln!(writer, "Totals across all searched datasets")?;
    write_counts(writer, &totals(results), q_value_threshold)?;

    if !results.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "Transient target PSMs at q <= {q_value_threshold} per dataset")?;
        for metrics in results {
            writeln!(
                writer,
                "{}\t{}",
                metrics.dataset_id,
                format_count(metrics.confident_transient_target_psms)
            )?;
        }
    }

    if !failed.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "Failed datasets")?;
        for failure in failed {
            writeln!(writer, "{}\t{}", failure.dataset_id, failure.reason)?;
        }
    }
    Ok(())
}
