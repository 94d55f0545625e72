//! CLI command implementations for fgsweep.
//!
//! - [`sweep`] - Search every transient database and write per-dataset and run-level outputs
//! - [`report`] - Rebuild the run-level outputs from an existing incremental results file

#![allow(
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::uninlined_format_args
)]

pub mod command;
pub mod common;
pub mod report;
pub mod sweep;
