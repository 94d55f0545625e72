#![deny(unsafe_code)]

//! Structured metric types and TSV writer for fgsweep.
//!
//! This crate provides:
//! - [`Metric`] trait for serializable metric rows
//! - [`transient`] module with the per-dataset result record
//! - [`writer`] module for TSV file output

pub mod transient;
pub mod writer;

use serde::{Deserialize, Serialize};

/// Formats a count with thousands separators.
///
/// # Example
/// ```
/// use fgsweep_metrics::format_count;
/// assert_eq!(format_count(1234567), "1,234,567");
/// assert_eq!(format_count(12), "12");
/// ```
#[must_use]
pub fn format_count(n: u64) -> String {
    let s = n.to_string();
    s.as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

/// A metric type that can be serialized to TSV files.
pub trait Metric: Serialize + for<'de> Deserialize<'de> + Clone + Default {
    /// Human-readable name for this metric type.
    ///
    /// Used in error messages and logging when writing metrics files.
    fn metric_name() -> &'static str;
}

pub use transient::TransientSearchMetrics;
pub use writer::{write_metrics, write_metrics_auto};
