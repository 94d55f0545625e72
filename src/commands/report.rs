//! Rebuild the run-level outputs from an existing incremental results file.

use anyhow::{Result, bail};
use clap::Parser;
use fgsweep_lib::cache::ResultCache;
use fgsweep_lib::config::DEFAULT_Q_VALUE_THRESHOLD;
use fgsweep_lib::logging::OperationTimer;
use fgsweep_lib::metrics::TransientSearchMetrics;
use fgsweep_lib::report::{ALL_RESULTS_FILE, RUN_SUMMARY_FILE, write_run_summary};
use fgsweep_lib::validation::validate_file_exists;
use log::info;
use std::fs;
use std::path::PathBuf;

use crate::commands::command::Command;

/// Rebuild the full results dump and aggregate report without searching.
#[derive(Debug, Parser)]
#[command(
    name = "report",
    about = "\x1b[38;5;166m[UTILITIES]\x1b[0m      \x1b[36mRebuild the aggregate report from recorded results\x1b[0m",
    long_about = r#"
Rebuild all_transient_results.tsv and run_summary.txt from a transient_search_results.tsv file.

Later rows for the same dataset replace earlier ones. A file that is truncated or malformed is
treated as empty and the command fails, since there is nothing to report.

Example usage:
  fgsweep report -i results/transient_search_results.tsv -o results/
"#
)]
pub struct Report {
    /// Incremental results file written by `fgsweep sweep`
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Output directory
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// q-value threshold quoted in the report
    #[arg(short = 'q', long = "q-value-threshold", default_value_t = DEFAULT_Q_VALUE_THRESHOLD)]
    pub q_value_threshold: f64,
}

impl Command for Report {
    fn execute(&self, _command_line: &str) -> Result<()> {
        validate_file_exists(&self.input, "Results")?;
        let timer = OperationTimer::new("Rebuilding report");

        let cache: ResultCache<TransientSearchMetrics> = ResultCache::new(&self.input);
        let loaded = cache.initialize();
        if loaded == 0 {
            bail!("No results could be read from {}", self.input.display());
        }

        fs::create_dir_all(&self.output)?;
        let all_results = self.output.join(ALL_RESULTS_FILE);
        cache.write_all_to_file(&all_results)?;
        write_run_summary(
            &self.output.join(RUN_SUMMARY_FILE),
            &cache.values(),
            &[],
            self.q_value_threshold,
        )?;
        info!("Wrote {} and {}", all_results.display(), RUN_SUMMARY_FILE);
        timer.log_completion(loaded as u64);
        Ok(())
    }
}
