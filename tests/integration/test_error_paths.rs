//! Error path integration tests.
//!
//! These tests verify that bad inputs are rejected up front and that a failing dataset never
//! stops its siblings.

use fgsweep_lib::cancel::CancellationToken;
use fgsweep_lib::config::SweepConfig;
use fgsweep_lib::errors::SweepError;
use fgsweep_lib::report::{INCREMENTAL_RESULTS_FILE, RUN_SUMMARY_FILE};
use fgsweep_lib::scheduler::JobState;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use crate::helpers::{
    CountingSearch, TRANSIENTS, data_rows, scheduler_with, test_config, write_fasta,
    write_run_inputs,
};

// ==================== Run-level errors ====================

#[test]
fn test_duplicate_dataset_ids_rejected() {
    let dir = TempDir::new().unwrap();
    let mut inputs = write_run_inputs(dir.path(), 2);
    let nested = dir.path().join("nested");
    fs::create_dir(&nested).unwrap();
    let copy = nested.join("sample0.fasta.gz");
    fs::copy(&inputs.transients[0].path, &copy).unwrap();
    inputs.transients.push(fgsweep_lib::database::DatabaseDescriptor::new(copy, true));

    let search = Arc::new(CountingSearch::default());
    let err = scheduler_with(test_config(), &search)
        .run(&inputs, &CancellationToken::new())
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SweepError>(),
        Some(SweepError::DuplicateDataset { dataset_id }) if dataset_id == "sample0"
    ));
    assert_eq!(search.calls(), 0);
}

#[test]
fn test_invalid_config_rejected() {
    let dir = TempDir::new().unwrap();
    let inputs = write_run_inputs(dir.path(), 1);
    let search = Arc::new(CountingSearch::default());

    let config = SweepConfig { max_concurrent_jobs: 0, ..test_config() };
    let err = scheduler_with(config, &search).run(&inputs, &CancellationToken::new()).unwrap_err();
    assert!(err.to_string().contains("max-concurrent-jobs"));

    let mut config = test_config();
    config.filter.q_value_threshold = 1.5;
    assert!(scheduler_with(config, &search).run(&inputs, &CancellationToken::new()).is_err());
    assert_eq!(search.calls(), 0);
}

#[test]
fn test_unreadable_baseline_stops_run() {
    let dir = TempDir::new().unwrap();
    let inputs = write_run_inputs(dir.path(), 2);
    fs::write(&inputs.baseline.path, "PEPTIDEK\n>B1\nPEPTIDEK\n").unwrap();

    let search = Arc::new(CountingSearch::default());
    let err = scheduler_with(test_config(), &search)
        .run(&inputs, &CancellationToken::new())
        .unwrap_err();
    assert!(format!("{err:#}").contains("baseline.fasta"), "{err:#}");
    assert!(!inputs.output_dir.join(INCREMENTAL_RESULTS_FILE).exists());
}

// ==================== Per-dataset failures ====================

#[test]
fn test_failed_dataset_does_not_stop_siblings() {
    let dir = TempDir::new().unwrap();
    let inputs = write_run_inputs(dir.path(), 3);
    let missing = inputs.transients[1].path.clone();
    fs::remove_file(&missing).unwrap();

    let search = Arc::new(CountingSearch::default());
    let summary =
        scheduler_with(test_config(), &search).run(&inputs, &CancellationToken::new()).unwrap();

    assert_eq!(summary.count(JobState::Completed), 2);
    assert_eq!(summary.count(JobState::Failed), 1);
    let failed = &summary.outcomes[1];
    assert_eq!(failed.dataset_id, "sample1");
    assert!(failed.error.as_deref().unwrap().contains("sample1.fasta"));
    assert!(failed.metrics.is_none());

    let out = &inputs.output_dir;
    assert_eq!(data_rows(&out.join(INCREMENTAL_RESULTS_FILE)), 2);
    let report = fs::read_to_string(out.join(RUN_SUMMARY_FILE)).unwrap();
    assert!(report.contains("Transient datasets searched: 2"));
    assert!(report.contains("Transient datasets failed: 1"));
    assert!(report.contains("sample1\t"));

    // The failed dataset has no result, so the next run retries only it.
    write_fasta(&missing, &[TRANSIENTS[1]]);
    let retry = Arc::new(CountingSearch::default());
    let summary =
        scheduler_with(test_config(), &retry).run(&inputs, &CancellationToken::new()).unwrap();
    assert_eq!(retry.calls(), 1 + 1);
    assert_eq!(summary.count(JobState::Completed), 1);
    assert_eq!(data_rows(&out.join(INCREMENTAL_RESULTS_FILE)), 3);
}

#[test]
fn test_malformed_transient_reports_dataset() {
    let dir = TempDir::new().unwrap();
    let inputs = write_run_inputs(dir.path(), 2);
    fs::write(&inputs.transients[0].path, "AAAAAAAK\n").unwrap();

    let search = Arc::new(CountingSearch::default());
    let summary =
        scheduler_with(test_config(), &search).run(&inputs, &CancellationToken::new()).unwrap();
    assert_eq!(summary.outcomes[0].state, JobState::Failed);
    assert_eq!(summary.outcomes[1].state, JobState::Completed);
    assert!(summary.outcomes[0].error.as_deref().unwrap().contains("sequence before first header"));
}
