//! Integration tests for the `sweep` and `report` commands.

use fgoxide::io::DelimFile;
use fgsweep_lib::metrics::TransientSearchMetrics;
use fgsweep_lib::report::{ALL_RESULTS_FILE, INCREMENTAL_RESULTS_FILE, RUN_SUMMARY_FILE};
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

use crate::helpers::{data_rows, write_run_inputs};

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_sweep_then_report() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let inputs = write_run_inputs(temp_dir.path(), 3);
    let out = &inputs.output_dir;

    let mut args = vec![
        "sweep".to_string(),
        "--baseline".to_string(),
        path_str(&inputs.baseline.path).to_string(),
        "--transient".to_string(),
    ];
    args.extend(inputs.transients.iter().map(|d| path_str(&d.path).to_string()));
    args.extend(
        [
            "--spectra",
            path_str(&inputs.spectra[0]),
            "--output",
            path_str(out),
            "--threads",
            "2",
            "--max-concurrent-jobs",
            "2",
            "--max-missed-cleavages",
            "0",
        ]
        .iter()
        .map(ToString::to_string),
    );

    let status = Command::new(env!("CARGO_BIN_EXE_fgsweep"))
        .args(&args)
        .status()
        .expect("Failed to run sweep command");
    assert!(status.success(), "Sweep command failed");
    assert_eq!(data_rows(&out.join(INCREMENTAL_RESULTS_FILE)), 3);
    for id in ["sample0", "sample1", "sample2"] {
        assert!(out.join(id).join("summary.txt").exists(), "no summary for {id}");
    }

    let rebuilt = temp_dir.path().join("rebuilt");
    let status = Command::new(env!("CARGO_BIN_EXE_fgsweep"))
        .args([
            "report",
            "--input",
            path_str(&out.join(INCREMENTAL_RESULTS_FILE)),
            "--output",
            path_str(&rebuilt),
        ])
        .status()
        .expect("Failed to run report command");
    assert!(status.success(), "Report command failed");

    let original: Vec<TransientSearchMetrics> =
        DelimFile::default().read_tsv(&out.join(ALL_RESULTS_FILE)).unwrap();
    let again: Vec<TransientSearchMetrics> =
        DelimFile::default().read_tsv(&rebuilt.join(ALL_RESULTS_FILE)).unwrap();
    assert_eq!(original, again);

    let report = fs::read_to_string(rebuilt.join(RUN_SUMMARY_FILE)).unwrap();
    assert!(report.starts_with("Transient datasets searched: 3\n"));
}

#[test]
fn test_sweep_missing_baseline_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let inputs = write_run_inputs(temp_dir.path(), 1);
    fs::remove_file(&inputs.baseline.path).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_fgsweep"))
        .args([
            "sweep",
            "-b",
            path_str(&inputs.baseline.path),
            "-d",
            path_str(&inputs.transients[0].path),
            "-s",
            path_str(&inputs.spectra[0]),
            "-o",
            path_str(&inputs.output_dir),
        ])
        .output()
        .expect("Failed to run sweep command");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Baseline database"));
    assert!(!inputs.output_dir.exists());
}

#[test]
fn test_report_rejects_empty_results() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = temp_dir.path().join(INCREMENTAL_RESULTS_FILE);
    fs::write(&input, "").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_fgsweep"))
        .args(["report", "-i", path_str(&input), "-o", path_str(temp_dir.path())])
        .status()
        .expect("Failed to run report command");
    assert!(!status.success());
}
