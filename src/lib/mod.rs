#![deny(unsafe_code)]
// Clippy lint configuration for CI
// These lints are allowed because:
// - cast_*: Scientific/bioinformatics code intentionally casts between numeric types
// - missing_*_doc: Documentation improvements tracked separately
// - needless_pass_by_value: Some APIs designed for ownership transfer
// - items_after_statements: Some test code uses late item declarations
// - unused_self: Trait implementations may not use self
// - match_same_arms: Sometimes clearer to list arms explicitly
// - unnecessary_wraps: Some Result returns are for API consistency
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::needless_pass_by_value,
    clippy::items_after_statements,
    clippy::unused_self,
    clippy::match_same_arms,
    clippy::unnecessary_wraps,
    clippy::too_many_lines,
    clippy::redundant_closure_for_method_calls,
    clippy::explicit_iter_loop,
    clippy::struct_excessive_bools,
    clippy::map_unwrap_or,
    clippy::uninlined_format_args
)]

//! # fgsweep - Transient Database Search Library
//!
//! This library searches many small "transient" protein databases against one set of spectra
//! that has already been searched against a large baseline database. The expensive work (loading
//! spectra, loading the baseline, the baseline search) is done once and shared; each transient
//! database then only needs its own small search and post-processing.
//!
//! ## Overview
//!
//! ### Orchestration
//!
//! - **[`scheduler`]** - Runs one job per transient database with bounded concurrency
//! - **[`context`]** - The shared, read-only baseline search state
//! - **[`pipeline`]** - Per-job post-search processing (dedup, FDR, disambiguation, grouping)
//! - **[`coordinator`]** - Join group for deferred output writers
//! - **[`cache`]** - Incremental, crash-tolerant per-dataset results file
//!
//! ### Search Collaborators
//!
//! - **[`database`]** / **[`modification`]** - FASTA and modification loading
//! - **[`digest`]** - Protein digestion into a mass-sorted peptide index
//! - **[`spectra`]** - Spectra loading
//! - **[`search`]** - Precursor-mass search
//! - **[`fdr`]**, **[`disambiguate`]**, **[`parsimony`]** - Confidence, ambiguity, and grouping
//!
//! ### Utilities
//!
//! - **[`output`]** / **[`report`]** - Per-dataset tables and the run-level report
//! - **[`compress`]** - Gzip compression with retry on sharing violations
//! - **[`progress`]**, **[`logging`]**, **[`cancel`]** - Progress, logging, and cancellation
//!
//! ## Quick Start
//!
//! ```no_run
//! use fgsweep_lib::cancel::CancellationToken;
//! use fgsweep_lib::collaborators::Collaborators;
//! use fgsweep_lib::config::SweepConfig;
//! use fgsweep_lib::database::DatabaseDescriptor;
//! use fgsweep_lib::scheduler::{JobScheduler, RunInputs};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = SweepConfig { max_concurrent_jobs: 2, ..SweepConfig::default() };
//! let inputs = RunInputs {
//!     baseline: DatabaseDescriptor::new("human.fasta", true),
//!     modifications: None,
//!     transients: vec![DatabaseDescriptor::new("sample1.fasta", true)],
//!     spectra: vec!["run1.tsv".into()],
//!     output_dir: "out".into(),
//! };
//! let scheduler = JobScheduler::new(config.clone(), Collaborators::from_config(&config));
//! let summary = scheduler.run(&inputs, &CancellationToken::new())?;
//! println!("{} datasets recorded", summary.cached_results);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cancel;
pub mod collaborators;
pub mod compress;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod database;
pub mod digest;
pub mod disambiguate;
pub mod errors;
pub mod fdr;
pub mod logging;
pub mod modification;
pub mod output;
pub mod parsimony;
pub mod pipeline;
pub mod progress;
pub mod psm;
pub mod report;
pub mod scheduler;
pub mod search;
pub mod spectra;
pub mod validation;

pub use fgsweep_metrics as metrics;
