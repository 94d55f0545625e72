//! Output options: transient-only tables, the spectral library, row filters, and compression.

use flate2::read::GzDecoder;
use fgsweep_lib::cancel::CancellationToken;
use fgsweep_lib::config::SweepConfig;
use fgsweep_lib::output::{
    JOB_SUMMARY_FILE, LIBRARY_FILE, PEPTIDES_FILE, PROTEIN_GROUPS_FILE, PSMS_FILE,
    TRANSIENT_PSMS_FILE,
};
use fgsweep_lib::report::{ALL_RESULTS_FILE, RUN_SUMMARY_FILE};
use std::fs::{self, File};
use std::io::Read;
use std::sync::Arc;
use tempfile::TempDir;

use crate::helpers::{CountingSearch, data_rows, scheduler_with, test_config, write_run_inputs};

#[test]
fn test_transient_results_only_with_library() {
    let dir = TempDir::new().unwrap();
    let inputs = write_run_inputs(dir.path(), 1);
    let config = SweepConfig {
        transient_results_only: true,
        write_spectral_library: true,
        grouping: false,
        ..test_config()
    };
    let search = Arc::new(CountingSearch::default());
    scheduler_with(config, &search).run(&inputs, &CancellationToken::new()).unwrap();

    let job = inputs.output_dir.join("sample0");
    assert!(!job.join(PSMS_FILE).exists());
    assert!(!job.join(PEPTIDES_FILE).exists());
    assert!(!job.join(PROTEIN_GROUPS_FILE).exists());
    assert_eq!(data_rows(&job.join(TRANSIENT_PSMS_FILE)), 1);

    let library = fs::read_to_string(job.join(LIBRARY_FILE)).unwrap();
    let rows: Vec<&str> = library.lines().skip(1).collect();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with("AAAAAAAK\t2\t"));
}

#[test]
fn test_contaminant_rows_filtered() {
    let dir = TempDir::new().unwrap();
    let mut inputs = write_run_inputs(dir.path(), 1);
    inputs.baseline.is_contaminant = true;
    let mut config = test_config();
    config.filter.write_contaminants = false;
    let search = Arc::new(CountingSearch::default());
    let summary =
        scheduler_with(config, &search).run(&inputs, &CancellationToken::new()).unwrap();

    // Filtering only affects the tables, never the counts.
    let metrics = summary.outcomes[0].metrics.as_ref().unwrap();
    assert_eq!(metrics.total_psms, 4);
    let job = inputs.output_dir.join("sample0");
    assert_eq!(data_rows(&job.join(PSMS_FILE)), 1);
    assert!(fs::read_to_string(job.join(PSMS_FILE)).unwrap().contains("AAAAAAAK"));
}

#[test]
fn test_compressed_outputs() {
    let dir = TempDir::new().unwrap();
    let inputs = write_run_inputs(dir.path(), 2);
    let config = SweepConfig { compress_outputs: true, ..test_config() };
    let search = Arc::new(CountingSearch::default());
    let summary =
        scheduler_with(config, &search).run(&inputs, &CancellationToken::new()).unwrap();
    assert!(summary.writers.failures.is_empty());

    for id in ["sample0", "sample1"] {
        let job = inputs.output_dir.join(id);
        let names: Vec<String> = fs::read_dir(&job)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(!names.is_empty());
        assert!(names.iter().all(|n| n.ends_with(".gz")), "{names:?}");

        let mut text = String::new();
        GzDecoder::new(File::open(job.join(format!("{JOB_SUMMARY_FILE}.gz"))).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert!(text.starts_with(&format!("Transient database: {id}")));
    }

    // Run-level files are never compressed.
    assert!(inputs.output_dir.join(ALL_RESULTS_FILE).exists());
    assert!(inputs.output_dir.join(RUN_SUMMARY_FILE).exists());
}
