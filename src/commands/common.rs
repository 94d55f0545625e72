//! Common CLI options shared across commands.
//!
//! This module provides shared argument structures that can be composed into
//! command structs using `#[command(flatten)]`. Each group knows how to apply itself to a
//! [`SweepConfig`].

use std::time::Duration;

use clap::{ArgAction, Args};

use fgsweep_lib::compress::RetryPolicy;
use fgsweep_lib::config::{DEFAULT_Q_VALUE_THRESHOLD, SweepConfig};
use fgsweep_lib::database::DecoyHandling;

/// Search and confidence options.
#[derive(Debug, Clone, Args)]
pub struct SearchOptions {
    /// Precursor mass tolerance in parts per million
    #[arg(long = "precursor-tolerance-ppm", default_value_t = 10.0)]
    pub precursor_tolerance_ppm: f64,

    /// Accepted precursor mass differences in daltons (e.g. 0 1.00335 for one C13 isotope error)
    #[arg(long = "notches", num_args = 1.., default_values_t = vec![0.0])]
    pub notches: Vec<f64>,

    /// How decoy proteins are generated
    #[arg(long = "decoys", value_enum, default_value_t = DecoyHandling::Reverse)]
    pub decoy_handling: DecoyHandling,

    /// Minimum peptide length
    #[arg(long = "min-peptide-length", default_value_t = 7)]
    pub min_peptide_length: usize,

    /// Maximum peptide length
    #[arg(long = "max-peptide-length", default_value_t = 50)]
    pub max_peptide_length: usize,

    /// Maximum missed cleavages per peptide
    #[arg(long = "max-missed-cleavages", default_value_t = 2)]
    pub max_missed_cleavages: usize,

    /// q-value at or below which a match, peptide, or group is confident
    #[arg(short = 'q', long = "q-value-threshold", default_value_t = DEFAULT_Q_VALUE_THRESHOLD)]
    pub q_value_threshold: f64,

    /// Build protein groups
    #[arg(long = "grouping", default_value_t = true, action = ArgAction::Set)]
    pub grouping: bool,
}

impl SearchOptions {
    /// Copies these options into `config`.
    pub fn apply(&self, config: &mut SweepConfig) {
        config.acceptor.tolerance_ppm = self.precursor_tolerance_ppm;
        config.acceptor.notches.clone_from(&self.notches);
        config.decoy_handling = self.decoy_handling;
        config.digestion.min_length = self.min_peptide_length;
        config.digestion.max_length = self.max_peptide_length;
        config.digestion.max_missed_cleavages = self.max_missed_cleavages;
        config.filter.q_value_threshold = self.q_value_threshold;
        config.grouping = self.grouping;
    }
}

/// Options controlling which output files and rows are written.
#[derive(Debug, Clone, Args)]
pub struct OutputOptions {
    /// Reprocess datasets that already have a recorded result
    #[arg(long = "overwrite", default_value_t = false)]
    pub overwrite: bool,

    /// Write only the tables restricted to transient matches
    #[arg(long = "transient-results-only", default_value_t = false)]
    pub transient_results_only: bool,

    /// Write a spectral library of the best confident transient match per sequence and charge
    #[arg(long = "spectral-library", default_value_t = false)]
    pub write_spectral_library: bool,

    /// Write decoy rows
    #[arg(long = "write-decoys", default_value_t = true, action = ArgAction::Set)]
    pub write_decoys: bool,

    /// Write contaminant rows
    #[arg(long = "write-contaminants", default_value_t = true, action = ArgAction::Set)]
    pub write_contaminants: bool,

    /// Write rows above the q-value threshold
    #[arg(long = "write-low-confidence", default_value_t = true, action = ArgAction::Set)]
    pub write_low_confidence: bool,

    /// Gzip each dataset's output files once they are written
    #[arg(long = "compress", default_value_t = false)]
    pub compress_outputs: bool,

    /// Attempts made to compress a file that another process holds open
    #[arg(long = "compression-retries", default_value_t = 5)]
    pub compression_retries: u32,

    /// Pause between compression attempts, in milliseconds
    #[arg(long = "compression-retry-delay-ms", default_value_t = 200)]
    pub compression_retry_delay_ms: u64,
}

impl OutputOptions {
    /// Copies these options into `config`.
    pub fn apply(&self, config: &mut SweepConfig) {
        config.overwrite = self.overwrite;
        config.transient_results_only = self.transient_results_only;
        config.write_spectral_library = self.write_spectral_library;
        config.filter.write_decoys = self.write_decoys;
        config.filter.write_contaminants = self.write_contaminants;
        config.filter.write_low_confidence = self.write_low_confidence;
        config.compress_outputs = self.compress_outputs;
        config.compression_retry = RetryPolicy {
            max_attempts: self.compression_retries.max(1),
            delay: Duration::from_millis(self.compression_retry_delay_ms),
        };
    }
}

/// Threading options.
#[derive(Debug, Clone, Args)]
pub struct ThreadingOptions {
    /// Total threads available to the run. Defaults to the number of available processors.
    #[arg(short = 't', long = "threads")]
    pub threads: Option<usize>,

    /// Maximum number of transient databases searched at once. Each job gets
    /// `threads / max-concurrent-jobs` search threads (at least one).
    #[arg(short = 'j', long = "max-concurrent-jobs", default_value_t = 1)]
    pub max_concurrent_jobs: usize,

    /// Threads used while loading spectra. Defaults to `--threads`.
    #[arg(long = "load-threads")]
    pub load_threads: Option<usize>,
}

impl ThreadingOptions {
    /// Copies these options into `config`, keeping the config's defaults for unset values.
    pub fn apply(&self, config: &mut SweepConfig) {
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        config.load_threads = self.load_threads.unwrap_or(config.threads);
        config.max_concurrent_jobs = self.max_concurrent_jobs;
    }

    /// Human-readable threading description for logging.
    #[must_use]
    pub fn log_message(config: &SweepConfig) -> String {
        format!(
            "Using {} threads: up to {} concurrent jobs with {} threads each",
            config.threads,
            config.max_concurrent_jobs,
            config.threads_per_job()
        )
    }
}
