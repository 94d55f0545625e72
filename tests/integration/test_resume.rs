//! Idempotence, resumption, overwrite, and cancellation across runs.

use fgsweep_lib::cache::ResultCache;
use fgsweep_lib::cancel::CancellationToken;
use fgsweep_lib::metrics::TransientSearchMetrics;
use fgsweep_lib::report::{ALL_RESULTS_FILE, INCREMENTAL_RESULTS_FILE};
use fgsweep_lib::scheduler::JobState;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use crate::helpers::{CountingSearch, data_rows, scheduler_with, test_config, write_run_inputs};

fn cached_ids(path: &std::path::Path) -> Vec<String> {
    let cache: ResultCache<TransientSearchMetrics> = ResultCache::new(path);
    cache.initialize();
    cache.keys()
}

#[test]
fn test_second_run_does_no_searching() {
    let dir = TempDir::new().unwrap();
    let inputs = write_run_inputs(dir.path(), 3);
    let all_results = inputs.output_dir.join(ALL_RESULTS_FILE);

    let first = Arc::new(CountingSearch::default());
    scheduler_with(test_config(), &first).run(&inputs, &CancellationToken::new()).unwrap();
    let first_dump = fs::read_to_string(&all_results).unwrap();

    let second = Arc::new(CountingSearch::default());
    let summary =
        scheduler_with(test_config(), &second).run(&inputs, &CancellationToken::new()).unwrap();

    assert_eq!(second.calls(), 0);
    assert!(!summary.context_built);
    assert_eq!(summary.count(JobState::Skipped), 3);
    assert!(summary.outcomes.iter().all(|o| o.metrics.is_some()));
    assert_eq!(fs::read_to_string(&all_results).unwrap(), first_dump);
    assert_eq!(data_rows(&inputs.output_dir.join(INCREMENTAL_RESULTS_FILE)), 3);
}

#[test]
fn test_resume_processes_only_missing_datasets() {
    let dir = TempDir::new().unwrap();
    let mut inputs = write_run_inputs(dir.path(), 4);
    let all = inputs.transients.clone();

    inputs.transients.truncate(2);
    let first = Arc::new(CountingSearch::default());
    scheduler_with(test_config(), &first).run(&inputs, &CancellationToken::new()).unwrap();
    assert_eq!(first.calls(), 3);

    inputs.transients = all;
    let second = Arc::new(CountingSearch::default());
    let summary =
        scheduler_with(test_config(), &second).run(&inputs, &CancellationToken::new()).unwrap();

    assert_eq!(second.calls(), 1 + 2);
    assert_eq!(summary.count(JobState::Skipped), 2);
    assert_eq!(summary.count(JobState::Completed), 2);
    assert_eq!(summary.cached_results, 4);
    let incremental = inputs.output_dir.join(INCREMENTAL_RESULTS_FILE);
    assert_eq!(data_rows(&incremental), 4);
    assert_eq!(cached_ids(&incremental), vec!["sample0", "sample1", "sample2", "sample3"]);
}

#[test]
fn test_overwrite_reprocesses_each_dataset_once() {
    let dir = TempDir::new().unwrap();
    let inputs = write_run_inputs(dir.path(), 3);
    let first = Arc::new(CountingSearch::default());
    scheduler_with(test_config(), &first).run(&inputs, &CancellationToken::new()).unwrap();

    let stale = inputs.output_dir.join("sample0").join("stale.txt");
    fs::write(&stale, "left over").unwrap();

    let config = fgsweep_lib::config::SweepConfig { overwrite: true, ..test_config() };
    let second = Arc::new(CountingSearch::default());
    let summary = scheduler_with(config, &second).run(&inputs, &CancellationToken::new()).unwrap();

    assert_eq!(second.calls(), 1 + 3);
    assert_eq!(summary.count(JobState::Completed), 3);
    assert!(summary.outcomes.iter().all(|o| o.reprocessed));
    assert!(!stale.exists(), "prior outputs should be removed before reprocessing");
    assert!(inputs.output_dir.join("sample0").join("summary.txt").exists());
    // Superseded rows are dropped once the run finishes.
    assert_eq!(data_rows(&inputs.output_dir.join(INCREMENTAL_RESULTS_FILE)), 3);
}

#[test]
fn test_failed_overwrite_is_retried_next_run() {
    let dir = TempDir::new().unwrap();
    let inputs = write_run_inputs(dir.path(), 3);
    let first = Arc::new(CountingSearch::default());
    scheduler_with(test_config(), &first).run(&inputs, &CancellationToken::new()).unwrap();

    let fasta = inputs.transients[1].path.clone();
    let good = fs::read(&fasta).unwrap();
    fs::write(&fasta, "SSSSSSSK\n").unwrap();
    let config = fgsweep_lib::config::SweepConfig { overwrite: true, ..test_config() };
    let overwrite = Arc::new(CountingSearch::default());
    let summary =
        scheduler_with(config, &overwrite).run(&inputs, &CancellationToken::new()).unwrap();
    assert_eq!(summary.outcomes[1].state, JobState::Failed);
    assert_eq!(summary.count(JobState::Completed), 2);

    let incremental = inputs.output_dir.join(INCREMENTAL_RESULTS_FILE);
    assert_eq!(cached_ids(&incremental), vec!["sample0", "sample2"]);
    assert_eq!(data_rows(&incremental), 2);
    assert_eq!(data_rows(&inputs.output_dir.join(ALL_RESULTS_FILE)), 2);

    fs::write(&fasta, good).unwrap();
    let retry = Arc::new(CountingSearch::default());
    let summary =
        scheduler_with(test_config(), &retry).run(&inputs, &CancellationToken::new()).unwrap();
    assert_eq!(retry.calls(), 1 + 1);
    assert_eq!(summary.outcomes[1].state, JobState::Completed);
    assert!(inputs.output_dir.join("sample1").join("summary.txt").exists());
    assert_eq!(cached_ids(&incremental), vec!["sample0", "sample1", "sample2"]);
}

#[test]
fn test_restart_after_stop_finishes_remaining_job() {
    let dir = TempDir::new().unwrap();
    let inputs = write_run_inputs(dir.path(), 3);
    let config =
        fgsweep_lib::config::SweepConfig { max_concurrent_jobs: 1, ..test_config() };

    // Searches: baseline, sample0, sample1, sample2. Stopping after the fourth lets the first two
    // jobs finish and stops the third before it is recorded.
    let cancel = CancellationToken::new();
    let stopping = Arc::new(CountingSearch::cancelling_after(4, cancel.clone()));
    let summary = scheduler_with(config.clone(), &stopping).run(&inputs, &cancel).unwrap();
    assert_eq!(summary.count(JobState::Completed), 2);
    assert_eq!(summary.count(JobState::Cancelled), 1);
    assert_eq!(summary.outcomes[2].dataset_id, "sample2");
    let incremental = inputs.output_dir.join(INCREMENTAL_RESULTS_FILE);
    assert_eq!(data_rows(&incremental), 2);

    let resumed = Arc::new(CountingSearch::default());
    let summary = scheduler_with(config, &resumed).run(&inputs, &CancellationToken::new()).unwrap();
    assert_eq!(resumed.calls(), 1 + 1);
    assert_eq!(summary.count(JobState::Completed), 1);
    assert_eq!(summary.count(JobState::Skipped), 2);
    assert_eq!(data_rows(&incremental), 3);
    assert_eq!(cached_ids(&incremental), vec!["sample0", "sample1", "sample2"]);
}

#[test]
fn test_truncated_results_file_is_reprocessed() {
    let dir = TempDir::new().unwrap();
    let inputs = write_run_inputs(dir.path(), 3);
    let incremental = inputs.output_dir.join(INCREMENTAL_RESULTS_FILE);
    let first = Arc::new(CountingSearch::default());
    scheduler_with(test_config(), &first).run(&inputs, &CancellationToken::new()).unwrap();

    let contents = fs::read_to_string(&incremental).unwrap();
    fs::write(&incremental, &contents[..contents.len() - 5]).unwrap();

    let second = Arc::new(CountingSearch::default());
    let summary =
        scheduler_with(test_config(), &second).run(&inputs, &CancellationToken::new()).unwrap();
    assert_eq!(second.calls(), 1 + 3);
    assert_eq!(summary.count(JobState::Completed), 3);
    assert_eq!(data_rows(&incremental), 3);
    assert_eq!(cached_ids(&incremental).len(), 3);
}

#[test]
fn test_cancelled_before_start_records_nothing() {
    let dir = TempDir::new().unwrap();
    let inputs = write_run_inputs(dir.path(), 2);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let search = Arc::new(CountingSearch::default());
    let result = scheduler_with(test_config(), &search).run(&inputs, &cancel);
    // The shared context itself is cancelled, so the run stops before any job.
    assert!(result.is_err());
    assert_eq!(search.calls(), 0);
    assert!(!inputs.output_dir.join(INCREMENTAL_RESULTS_FILE).exists());
}
