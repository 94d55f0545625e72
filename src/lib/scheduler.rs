//! The top-level control loop.
//!
//! [`JobScheduler::run`] performs one complete sweep:
//!
//! 1. validate the configuration and load the incremental results file
//! 2. build the [`SharedSearchContext`] once, unless every dataset is already cached
//! 3. run one job per transient database on at most `max_concurrent_jobs` worker threads
//! 4. join every output writer the jobs registered
//! 5. compress finished job directories, then write the full dump and the aggregate report
//!
//! Each job is isolated: an error or a panic inside one job marks that job failed, leaves no cache
//! entry for it, and does not stop any other job.

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::unbounded;
use fgsweep_metrics::TransientSearchMetrics;
use log::{error, info, warn};
use std::collections::BTreeSet;
use std::fs;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::cache::ResultCache;
use crate::cancel::CancellationToken;
use crate::collaborators::Collaborators;
use crate::compress::compress_output_dir_or_warn;
use crate::config::SweepConfig;
use crate::context::SharedSearchContext;
use crate::coordinator::{WriteCoordinator, WriteSummary};
use crate::database::DatabaseDescriptor;
use crate::digest::PeptideIndex;
use crate::errors::{SweepError, extract_panic_message};
use crate::logging::{OperationTimer, log_dataset_summary, log_run_summary};
use crate::pipeline::{JobContext, PostSearchPipeline};
use crate::progress::{LogProgress, ProgressEvent, ProgressReporter, ProgressTracker};
use crate::report::{
    ALL_RESULTS_FILE, FailedDataset, INCREMENTAL_RESULTS_FILE, RUN_SUMMARY_FILE,
    write_run_summary,
};

/// Root scope of every progress event.
pub const PROGRESS_ROOT: &str = "sweep";

/// Inputs to one sweep.
#[derive(Debug, Clone)]
pub struct RunInputs {
    /// The always-searched baseline database
    pub baseline: DatabaseDescriptor,
    /// Optional modification definitions
    pub modifications: Option<PathBuf>,
    /// One descriptor per transient database
    pub transients: Vec<DatabaseDescriptor>,
    /// Spectra sources
    pub spectra: Vec<PathBuf>,
    /// Output root; each dataset writes to `<output_dir>/<dataset id>/`
    pub output_dir: PathBuf,
}

/// Lifecycle of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Not yet checked against the cache
    Pending,
    /// Already cached and overwrite was not requested
    Skipped,
    /// Cached but overwrite was requested; prior outputs are being removed
    Reprocessing,
    /// Loading, searching, and post-processing
    Running,
    /// Result recorded in the cache
    Completed,
    /// Stopped by an error or panic
    Failed,
    /// Stopped by the cancellation signal; will be retried next run
    Cancelled,
}

/// What happened to one dataset.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    /// Dataset identifier
    pub dataset_id: String,
    /// Final state
    pub state: JobState,
    /// Result record, for completed and skipped jobs
    pub metrics: Option<TransientSearchMetrics>,
    /// Failure message, for failed jobs
    pub error: Option<String>,
    /// True if an earlier result was replaced
    pub reprocessed: bool,
    /// Output directory
    pub output_dir: PathBuf,
    /// Wall time spent on the job
    pub elapsed: Duration,
}

/// Result of a whole sweep.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// One outcome per transient database, in input order
    pub outcomes: Vec<JobOutcome>,
    /// True if the shared context was built (false when every dataset was cached)
    pub context_built: bool,
    /// Number of records in the cache at the end of the run
    pub cached_results: usize,
    /// Output writer totals
    pub writers: WriteSummary,
    /// Wall time of the whole run
    pub elapsed: Duration,
}

impl RunSummary {
    /// Number of outcomes in `state`.
    #[must_use]
    pub fn count(&self, state: JobState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }

    /// Outcomes of jobs that failed.
    pub fn failed(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|o| o.state == JobState::Failed)
    }
}

/// Runs a sweep over many transient databases.
pub struct JobScheduler {
    config: SweepConfig,
    collaborators: Collaborators,
    reporter: Arc<dyn ProgressReporter>,
}

impl JobScheduler {
    /// Creates a scheduler that reports progress to the log.
    #[must_use]
    pub fn new(config: SweepConfig, collaborators: Collaborators) -> Self {
        Self { config, collaborators, reporter: Arc::new(LogProgress) }
    }

    /// Replaces the progress reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Runs the sweep.
    ///
    /// Per-job failures are reported in the returned summary, not as an error.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid, two transient databases share an
    /// identifier, the output directory cannot be created, the shared context cannot be built,
    /// or the run-level outputs cannot be written.
    pub fn run(&self, inputs: &RunInputs, cancel: &CancellationToken) -> Result<RunSummary> {
        let start = Instant::now();
        self.config.validate()?;
        check_unique_ids(&inputs.transients)?;
        fs::create_dir_all(&inputs.output_dir).with_context(|| {
            format!("Failed to create output directory: {}", inputs.output_dir.display())
        })?;

        let cache = ResultCache::new(inputs.output_dir.join(INCREMENTAL_RESULTS_FILE));
        cache.initialize();

        let needs_search = self.config.overwrite
            || inputs.transients.iter().any(|d| !cache.contains(&d.dataset_id()));
        let context = if needs_search {
            Some(SharedSearchContext::build(
                &inputs.baseline,
                inputs.modifications.as_deref(),
                &inputs.spectra,
                &self.config,
                &self.collaborators,
                cancel,
            )?)
        } else {
            info!("Every transient database already has a result; nothing to search");
            None
        };

        let coordinator = WriteCoordinator::new(self.config.max_concurrent_jobs)?;
        let outcomes =
            self.run_jobs(inputs, context.as_ref(), &cache, &coordinator, cancel)?;

        let writers = coordinator.join();
        self.finish_outputs(&outcomes, &cache, inputs)?;

        let summary = RunSummary {
            outcomes,
            context_built: context.is_some(),
            cached_results: cache.len(),
            writers,
            elapsed: start.elapsed(),
        };
        log_run_summary(&summary);
        Ok(summary)
    }

    /// Runs every job on a fixed set of worker threads and returns the outcomes in input order.
    fn run_jobs(
        &self,
        inputs: &RunInputs,
        context: Option<&SharedSearchContext>,
        cache: &ResultCache<TransientSearchMetrics>,
        coordinator: &WriteCoordinator,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobOutcome>> {
        let total = inputs.transients.len();
        let workers = self.config.max_concurrent_jobs.min(total).max(1);
        let threads_per_job = self.config.threads_per_job();
        info!(
            "Searching {total} transient databases, {workers} at a time with {threads_per_job} \
             threads each"
        );

        let timer = OperationTimer::new("Searching transient databases");
        let tracker = ProgressTracker::new("Transient databases", total as u64);
        let cursor = AtomicUsize::new(0);
        let (sender, receiver) = unbounded::<(usize, JobOutcome)>();

        thread::scope(|scope| -> Result<()> {
            for worker in 0..workers {
                let sender = sender.clone();
                let (cursor, tracker) = (&cursor, &tracker);
                thread::Builder::new()
                    .name(format!("fgsweep-job-{worker}"))
                    .spawn_scoped(scope, move || {
                        loop {
                            let index = cursor.fetch_add(1, Ordering::SeqCst);
                            let Some(descriptor) = inputs.transients.get(index) else { break };
                            let outcome = self.run_job(
                                descriptor,
                                context,
                                cache,
                                coordinator,
                                &inputs.output_dir,
                                threads_per_job,
                                cancel,
                            );
                            self.report(&outcome.dataset_id, 100, format!("{:?}", outcome.state));
                            let percent = tracker.increment();
                            self.reporter.report(&ProgressEvent::new(
                                &[PROGRESS_ROOT.to_string()],
                                percent,
                                format!("{}/{total} transient databases done", tracker.count()),
                            ));
                            if sender.send((index, outcome)).is_err() {
                                break;
                            }
                        }
                    })
                    .context("Failed to spawn job worker thread")?;
            }
            Ok(())
        })?;
        drop(sender);

        let mut outcomes: Vec<(usize, JobOutcome)> = receiver.iter().collect();
        outcomes.sort_by_key(|(index, _)| *index);
        tracker.log_final();
        timer.log_completion(total as u64);
        Ok(outcomes.into_iter().map(|(_, outcome)| outcome).collect())
    }

    /// Runs one job behind an error and panic boundary.
    #[allow(clippy::too_many_arguments)]
    fn run_job(
        &self,
        descriptor: &DatabaseDescriptor,
        context: Option<&SharedSearchContext>,
        cache: &ResultCache<TransientSearchMetrics>,
        coordinator: &WriteCoordinator,
        output_root: &Path,
        threads_per_job: usize,
        cancel: &CancellationToken,
    ) -> JobOutcome {
        let start = Instant::now();
        let dataset_id = descriptor.dataset_id();
        let output_dir = output_root.join(&dataset_id);
        let mut outcome = JobOutcome {
            dataset_id: dataset_id.clone(),
            state: JobState::Pending,
            metrics: None,
            error: None,
            reprocessed: false,
            output_dir: output_dir.clone(),
            elapsed: Duration::ZERO,
        };

        let result = catch_unwind(AssertUnwindSafe(|| {
            self.process(
                descriptor,
                &mut outcome,
                context,
                cache,
                coordinator,
                threads_per_job,
                cancel,
            )
        }));

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) if is_cancellation(&e) => {
                warn!("Transient database '{dataset_id}' was cancelled");
                outcome.state = JobState::Cancelled;
            }
            Ok(Err(e)) => {
                error!("Transient database '{dataset_id}' failed: {e:#}");
                outcome.state = JobState::Failed;
                outcome.error = Some(format!("{e:#}"));
            }
            Err(panic_info) => {
                let message = extract_panic_message(panic_info);
                error!("Transient database '{dataset_id}' panicked: {message}");
                outcome.state = JobState::Failed;
                outcome.error = Some(format!("panicked: {message}"));
            }
        }
        outcome.elapsed = start.elapsed();
        outcome
    }

    /// Moves one job through its states, updating `outcome` as it goes.
    #[allow(clippy::too_many_arguments)]
    fn process(
        &self,
        descriptor: &DatabaseDescriptor,
        outcome: &mut JobOutcome,
        context: Option<&SharedSearchContext>,
        cache: &ResultCache<TransientSearchMetrics>,
        coordinator: &WriteCoordinator,
        threads_per_job: usize,
        cancel: &CancellationToken,
    ) -> Result<()> {
        cancel.check()?;
        let dataset_id = outcome.dataset_id.clone();

        if let Some(previous) = cache.get(&dataset_id) {
            if !self.config.overwrite {
                outcome.state = JobState::Skipped;
                outcome.metrics = Some(previous);
                return Ok(());
            }
            outcome.state = JobState::Reprocessing;
            outcome.reprocessed = true;
            info!("Reprocessing transient database '{dataset_id}'");
            // The stale row must be gone from disk before its outputs are.
            cache.remove_and_write(&dataset_id)?;
        }

        // Anything left in the directory is from an earlier, replaced, or interrupted run.
        if outcome.output_dir.exists() {
            fs::remove_dir_all(&outcome.output_dir).with_context(|| {
                format!("Failed to remove {}", outcome.output_dir.display())
            })?;
        }
        fs::create_dir_all(&outcome.output_dir)
            .with_context(|| format!("Failed to create {}", outcome.output_dir.display()))?;

        outcome.state = JobState::Running;
        self.report(&dataset_id, 0, "Loading transient database");
        let context = context.ok_or_else(|| anyhow!("Shared search context was not built"))?;
        let database = self
            .collaborators
            .databases
            .load_database(descriptor)
            .with_context(|| format!("Failed to load {}", descriptor.path.display()))?;
        let accessions = database.accessions();
        let index = PeptideIndex::build(&database, context.modifications(), &self.config.digestion);
        cancel.check()?;

        self.report(&dataset_id, 25, "Searching");
        let mut matches = context.snapshot_matches();
        self.collaborators.search.search(
            context.scans(),
            &index,
            &mut matches,
            threads_per_job,
            cancel,
        )?;

        self.report(&dataset_id, 75, "Post-processing");
        let job = JobContext {
            dataset_id: &dataset_id,
            transient_accessions: &accessions,
            transient_proteins: database.len() as u64,
            output_dir: &outcome.output_dir,
        };
        let metrics = PostSearchPipeline::new(&self.config, &self.collaborators, coordinator)
            .run(&job, matches, cancel)?;

        if !cache.add_and_write(metrics.clone())? {
            warn!("A result for '{dataset_id}' was recorded by another job; keeping the first");
        }
        log_dataset_summary(&metrics);
        outcome.metrics = Some(metrics);
        outcome.state = JobState::Completed;
        Ok(())
    }

    /// Compresses completed job directories and writes the run-level outputs. Runs after every
    /// writer has been joined.
    fn finish_outputs(
        &self,
        outcomes: &[JobOutcome],
        cache: &ResultCache<TransientSearchMetrics>,
        inputs: &RunInputs,
    ) -> Result<()> {
        if self.config.compress_outputs {
            for outcome in outcomes.iter().filter(|o| o.state == JobState::Completed) {
                compress_output_dir_or_warn(&outcome.output_dir, &self.config.compression_retry);
            }
        }

        cache.write_all_to_file(&inputs.output_dir.join(ALL_RESULTS_FILE))?;

        let failed: Vec<FailedDataset> = outcomes
            .iter()
            .filter(|o| o.state == JobState::Failed)
            .map(|o| FailedDataset {
                dataset_id: o.dataset_id.clone(),
                reason: o.error.clone().unwrap_or_default(),
            })
            .collect();
        write_run_summary(
            &inputs.output_dir.join(RUN_SUMMARY_FILE),
            &cache.values(),
            &failed,
            self.config.q_value_threshold(),
        )
    }

    fn report(&self, dataset_id: &str, percent: u8, message: impl Into<String>) {
        let scope = [PROGRESS_ROOT.to_string(), dataset_id.to_string()];
        self.reporter.report(&ProgressEvent::new(&scope, percent, message));
    }
}

fn is_cancellation(error: &anyhow::Error) -> bool {
    matches!(error.downcast_ref::<SweepError>(), Some(SweepError::Cancelled))
}

fn check_unique_ids(transients: &[DatabaseDescriptor]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for descriptor in transients {
        let dataset_id = descriptor.dataset_id();
        if !seen.insert(dataset_id.clone()) {
            return Err(SweepError::DuplicateDataset { dataset_id }.into());
        }
    }
    Ok(())
}
