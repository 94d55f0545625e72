//! Run configuration.
//!
//! [`SweepConfig`] is the plain library-side view of every option the scheduler and pipeline read.
//! The command line builds one from its option groups; tests build one directly.

use crate::compress::RetryPolicy;
use crate::database::DecoyHandling;
use crate::digest::DigestionParams;
use crate::errors::{Result, SweepError};
use crate::parsimony::ProteinGroup;
use crate::psm::Psm;
use crate::search::MassDiffAcceptor;
use crate::validation::validate_positive;

/// Default q-value threshold for "confident" counts and filtering.
pub const DEFAULT_Q_VALUE_THRESHOLD: f64 = 0.01;

/// Controls which rows reach the output tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputFilter {
    /// Write decoy matches, peptides, and groups
    pub write_decoys: bool,
    /// Write contaminant matches, peptides, and groups
    pub write_contaminants: bool,
    /// Write rows above the q-value threshold
    pub write_low_confidence: bool,
    /// q-value at or below which a row is confident
    pub q_value_threshold: f64,
}

impl Default for OutputFilter {
    fn default() -> Self {
        Self {
            write_decoys: true,
            write_contaminants: true,
            write_low_confidence: true,
            q_value_threshold: DEFAULT_Q_VALUE_THRESHOLD,
        }
    }
}

impl OutputFilter {
    /// True if a match should be written.
    #[must_use]
    pub fn keeps_psm(&self, psm: &Psm) -> bool {
        self.keeps(psm.is_decoy(), psm.is_contaminant(), psm.passes(self.q_value_threshold))
    }

    /// True if a protein group should be written.
    #[must_use]
    pub fn keeps_group(&self, group: &ProteinGroup) -> bool {
        self.keeps(group.is_decoy, group.is_contaminant, group.passes(self.q_value_threshold))
    }

    fn keeps(&self, is_decoy: bool, is_contaminant: bool, confident: bool) -> bool {
        (self.write_decoys || !is_decoy)
            && (self.write_contaminants || !is_contaminant)
            && (self.write_low_confidence || confident)
    }
}

/// Options recognized by the scheduler and the post-search pipeline.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Reprocess datasets that already have a cached result
    pub overwrite: bool,
    /// Maximum number of transient databases searched at once
    pub max_concurrent_jobs: usize,
    /// Total processors available to the run
    pub threads: usize,
    /// Parallelism used while loading spectra sources
    pub load_threads: usize,
    /// Write the best transient match per (sequence, charge)
    pub write_spectral_library: bool,
    /// Skip the tables covering all matches and write only transient tables
    pub transient_results_only: bool,
    /// Gzip each job's output directory after its files are written
    pub compress_outputs: bool,
    /// How decoys are generated
    pub decoy_handling: DecoyHandling,
    /// Precursor tolerance and notches
    pub acceptor: MassDiffAcceptor,
    /// Digestion settings for the baseline and transient databases
    pub digestion: DigestionParams,
    /// Build and write protein groups
    pub grouping: bool,
    /// Row filters and the confidence threshold
    pub filter: OutputFilter,
    /// Retry behavior for output compression
    pub compression_retry: RetryPolicy,
}

impl Default for SweepConfig {
    fn default() -> Self {
        let threads = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        Self {
            overwrite: false,
            max_concurrent_jobs: 1,
            threads,
            load_threads: threads,
            write_spectral_library: false,
            transient_results_only: false,
            compress_outputs: false,
            decoy_handling: DecoyHandling::default(),
            acceptor: MassDiffAcceptor::default(),
            digestion: DigestionParams::default(),
            grouping: true,
            filter: OutputFilter::default(),
            compression_retry: RetryPolicy::default(),
        }
    }
}

impl SweepConfig {
    /// Threads each concurrently running job may use: `max(1, threads / max_concurrent_jobs)`.
    #[must_use]
    pub fn threads_per_job(&self) -> usize {
        (self.threads / self.max_concurrent_jobs.max(1)).max(1)
    }

    /// The q-value threshold used for confident counts.
    #[must_use]
    pub fn q_value_threshold(&self) -> f64 {
        self.filter.q_value_threshold
    }

    /// Checks option values that would make the run meaningless.
    ///
    /// # Errors
    /// Returns [`SweepError::InvalidParameter`] for the first invalid option.
    pub fn validate(&self) -> Result<()> {
        validate_positive(self.max_concurrent_jobs, "max-concurrent-jobs")?;
        validate_positive(self.threads, "threads")?;
        validate_positive(self.load_threads, "load-threads")?;
        let q = self.filter.q_value_threshold;
        if q.is_nan() || q <= 0.0 || q > 1.0 {
            return Err(SweepError::invalid_parameter(
                "q-value-threshold",
                format!("must be in (0, 1], got {q}"),
            ));
        }
        if self.acceptor.tolerance_ppm.is_nan() || self.acceptor.tolerance_ppm <= 0.0 {
            return Err(SweepError::invalid_parameter(
                "precursor-tolerance-ppm",
                format!("must be > 0, got {}", self.acceptor.tolerance_ppm),
            ));
        }
        if self.acceptor.notches.is_empty() {
            return Err(SweepError::invalid_parameter("notch", "at least one notch is required"));
        }
        let digestion = &self.digestion;
        if digestion.min_length == 0 || digestion.min_length > digestion.max_length {
            return Err(SweepError::invalid_parameter(
                "min-peptide-length",
                format!(
                    "must be between 1 and max-peptide-length ({}), got {}",
                    digestion.max_length, digestion.min_length
                ),
            ));
        }
        Ok(())
    }
}
