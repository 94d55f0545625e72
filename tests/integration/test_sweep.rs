//! End-to-end sweeps through the library.

use fgoxide::io::DelimFile;
use fgsweep_lib::cancel::CancellationToken;
use fgsweep_lib::metrics::TransientSearchMetrics;
use fgsweep_lib::output::{
    JOB_SUMMARY_FILE, PEPTIDES_FILE, PROTEIN_GROUPS_FILE, PSMS_FILE, TRANSIENT_PEPTIDES_FILE,
    TRANSIENT_PSMS_FILE,
};
use fgsweep_lib::report::{ALL_RESULTS_FILE, INCREMENTAL_RESULTS_FILE, RUN_SUMMARY_FILE};
use fgsweep_lib::scheduler::JobState;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use crate::helpers::{CountingSearch, data_rows, scheduler_with, test_config, write_run_inputs};

#[test]
fn test_three_datasets_two_at_a_time() {
    let dir = TempDir::new().unwrap();
    let inputs = write_run_inputs(dir.path(), 3);
    let search = Arc::new(CountingSearch::default());
    let summary =
        scheduler_with(test_config(), &search).run(&inputs, &CancellationToken::new()).unwrap();

    assert_eq!(summary.count(JobState::Completed), 3);
    assert!(summary.context_built);
    // One baseline search plus one per dataset.
    assert_eq!(search.calls(), 4);

    let out = &inputs.output_dir;
    let job_dirs: Vec<String> = fs::read_dir(out)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(job_dirs.len(), 3);
    for id in ["sample0", "sample1", "sample2"] {
        assert!(job_dirs.iter().any(|d| d == id), "missing output directory for {id}");
    }

    assert_eq!(data_rows(&out.join(INCREMENTAL_RESULTS_FILE)), 3);
    let report = fs::read_to_string(out.join(RUN_SUMMARY_FILE)).unwrap();
    assert!(report.contains("Transient datasets searched: 3"), "{report}");
    assert!(report.contains("Transient datasets failed: 0"));
}

#[test]
fn test_per_dataset_counts() {
    let dir = TempDir::new().unwrap();
    let inputs = write_run_inputs(dir.path(), 4);
    let search = Arc::new(CountingSearch::default());
    scheduler_with(test_config(), &search).run(&inputs, &CancellationToken::new()).unwrap();

    let results: Vec<TransientSearchMetrics> =
        DelimFile::default().read_tsv(&inputs.output_dir.join(ALL_RESULTS_FILE)).unwrap();
    let ids: Vec<&str> = results.iter().map(|m| m.dataset_id.as_str()).collect();
    assert_eq!(ids, vec!["sample0", "sample1", "sample2", "sample3"]);

    for metrics in &results[..3] {
        assert_eq!(metrics.transient_proteins, 2, "target plus decoy");
        assert_eq!(metrics.total_psms, 4, "three baseline matches and one transient match");
        assert_eq!(metrics.decoy_psms, 0);
        assert_eq!(metrics.transient_psms, 1);
        assert_eq!(metrics.confident_transient_target_psms, 1);
        assert_eq!(metrics.transient_peptides, 1);
        assert_eq!(metrics.protein_groups, 4);
        assert_eq!(metrics.transient_protein_groups, 1);
    }

    // No scan matches the fourth dataset's only peptide.
    let last = &results[3];
    assert_eq!(last.total_psms, 3);
    assert_eq!(last.transient_psms, 0);
    assert_eq!(last.transient_protein_groups, 0);
}

#[test]
fn test_job_output_files() {
    let dir = TempDir::new().unwrap();
    let inputs = write_run_inputs(dir.path(), 1);
    let search = Arc::new(CountingSearch::default());
    let summary =
        scheduler_with(test_config(), &search).run(&inputs, &CancellationToken::new()).unwrap();
    assert!(summary.writers.failures.is_empty());

    let job = inputs.output_dir.join("sample0");
    assert_eq!(data_rows(&job.join(PSMS_FILE)), 4);
    assert_eq!(data_rows(&job.join(TRANSIENT_PSMS_FILE)), 1);
    assert_eq!(data_rows(&job.join(PEPTIDES_FILE)), 4);
    assert_eq!(data_rows(&job.join(TRANSIENT_PEPTIDES_FILE)), 1);
    assert_eq!(data_rows(&job.join(PROTEIN_GROUPS_FILE)), 4);

    let transient = fs::read_to_string(job.join(TRANSIENT_PSMS_FILE)).unwrap();
    assert!(transient.contains("AAAAAAAK"));
    assert!(transient.contains("T0"));
    assert!(!transient.contains("PEPTIDEK"));

    let summary_text = fs::read_to_string(job.join(JOB_SUMMARY_FILE)).unwrap();
    assert!(summary_text.starts_with("Transient database: sample0"));
}

#[test]
fn test_matches_are_independent_between_jobs() {
    let dir = TempDir::new().unwrap();
    let inputs = write_run_inputs(dir.path(), 3);
    let search = Arc::new(CountingSearch::default());
    scheduler_with(test_config(), &search).run(&inputs, &CancellationToken::new()).unwrap();

    // Each job only sees its own transient match on top of the baseline matches.
    for (i, sequence) in ["AAAAAAAK", "SSSSSSSK", "TTTTTTTK"].iter().enumerate() {
        let psms =
            fs::read_to_string(inputs.output_dir.join(format!("sample{i}")).join(PSMS_FILE))
                .unwrap();
        assert!(psms.contains(sequence));
        for (j, other) in ["AAAAAAAK", "SSSSSSSK", "TTTTTTTK"].iter().enumerate() {
            if i != j {
                assert!(!psms.contains(other), "sample{i} saw {other}");
            }
        }
    }
}
