//! Search many transient protein databases against one shared, pre-searched spectra context.

use anyhow::{Result, bail};
use clap::{ArgAction, Parser};
use fgsweep_lib::cancel::{CancellationToken, cancel_on_interrupt};
use fgsweep_lib::collaborators::Collaborators;
use fgsweep_lib::config::SweepConfig;
use fgsweep_lib::database::DatabaseDescriptor;
use fgsweep_lib::scheduler::{JobScheduler, JobState, RunInputs};
use fgsweep_lib::validation::{validate_file_exists, validate_files_exist, validate_not_empty};
use log::info;
use std::path::PathBuf;

use crate::commands::command::Command;
use crate::commands::common::{OutputOptions, SearchOptions, ThreadingOptions};

/// Search transient databases against a shared baseline search.
#[derive(Debug, Parser)]
#[command(
    name = "sweep",
    about = "\x1b[38;5;30m[SEARCH]\x1b[0m         \x1b[36mSearch many transient databases against shared spectra\x1b[0m",
    long_about = r#"
Search many small "transient" protein databases against one set of spectra.

The spectra are loaded and searched against the baseline database once. Each transient database
is then digested and searched on its own, starting from a copy of the baseline matches, and
post-processed (FDR, disambiguation, protein grouping) independently. Each dataset writes its
tables to <output>/<dataset>/, where the dataset identifier is the transient FASTA file name
without its extension.

One row per finished dataset is appended to <output>/transient_search_results.tsv as soon as the
dataset completes. Re-running with the same output directory skips every dataset already listed
there, so an interrupted run resumes where it stopped. Use --overwrite to reprocess them. Ctrl-C
stops running jobs at their next checkpoint without recording them.

Decoys are generated by reversing each protein when --decoys is reverse. --baseline-decoys and
--transient-decoys turn that off for the baseline or the transient databases.

Spectra are TSV files with the columns scan, precursor_mass, charge, and retention_time.
Modifications are TSV files with the columns id, residue, mass_shift, and kind (fixed|variable).

Example usage:
  fgsweep sweep -b human.fasta -d sample*.fasta -s run1.tsv run2.tsv -o results/
  fgsweep sweep -b human.fasta -d sample*.fasta -s run1.tsv -o results/ -t 16 -j 4 --compress
"#
)]
pub struct Sweep {
    /// Baseline protein database (FASTA, optionally gzipped)
    #[arg(short = 'b', long = "baseline")]
    pub baseline: PathBuf,

    /// Transient protein databases, one job each
    #[arg(short = 'd', long = "transient", num_args = 1.., required = true)]
    pub transients: Vec<PathBuf>,

    /// Spectra files
    #[arg(short = 's', long = "spectra", num_args = 1.., required = true)]
    pub spectra: Vec<PathBuf>,

    /// Modification definitions
    #[arg(short = 'm', long = "modifications")]
    pub modifications: Option<PathBuf>,

    /// Treat every protein in the baseline database as a contaminant
    #[arg(long = "baseline-is-contaminant", default_value_t = false)]
    pub baseline_is_contaminant: bool,

    /// Generate decoys for the baseline database (when --decoys is not none)
    #[arg(long = "baseline-decoys", default_value_t = true, action = ArgAction::Set)]
    pub baseline_decoys: bool,

    /// Generate decoys for the transient databases (when --decoys is not none)
    #[arg(long = "transient-decoys", default_value_t = true, action = ArgAction::Set)]
    pub transient_decoys: bool,

    /// Output directory
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Search options
    #[command(flatten)]
    pub search: SearchOptions,

    /// Output options
    #[command(flatten)]
    pub outputs: OutputOptions,

    /// Threading options
    #[command(flatten)]
    pub threading: ThreadingOptions,
}

impl Sweep {
    /// Builds the library configuration from the command-line options.
    fn config(&self) -> SweepConfig {
        let mut config = SweepConfig::default();
        self.search.apply(&mut config);
        self.outputs.apply(&mut config);
        self.threading.apply(&mut config);
        config
    }

    fn inputs(&self) -> RunInputs {
        let mut baseline = DatabaseDescriptor::new(&self.baseline, self.baseline_decoys);
        baseline.is_contaminant = self.baseline_is_contaminant;
        RunInputs {
            baseline,
            modifications: self.modifications.clone(),
            transients: self
                .transients
                .iter()
                .map(|path| DatabaseDescriptor::new(path, self.transient_decoys))
                .collect(),
            spectra: self.spectra.clone(),
            output_dir: self.output.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        validate_file_exists(&self.baseline, "Baseline database")?;
        validate_not_empty(&self.transients, "transient")?;
        validate_not_empty(&self.spectra, "spectra")?;
        let transients: Vec<_> =
            self.transients.iter().map(|p| (p.as_path(), "Transient database")).collect();
        validate_files_exist(&transients)?;
        let spectra: Vec<_> = self.spectra.iter().map(|p| (p.as_path(), "Spectra")).collect();
        validate_files_exist(&spectra)?;
        if let Some(mods) = &self.modifications {
            validate_file_exists(mods, "Modifications")?;
        }
        Ok(())
    }
}

impl Command for Sweep {
    fn execute(&self, command_line: &str) -> Result<()> {
        self.validate()?;
        let config = self.config();
        config.validate()?;

        info!("Command line: {command_line}");
        info!("Baseline: {}", self.baseline.display());
        info!("Transient databases: {}", self.transients.len());
        info!("Spectra files: {}", self.spectra.len());
        info!("Output: {}", self.output.display());
        info!("{}", ThreadingOptions::log_message(&config));

        let cancel = CancellationToken::new();
        cancel_on_interrupt(&cancel)?;
        let collaborators = Collaborators::from_config(&config);
        let summary = JobScheduler::new(config, collaborators).run(&self.inputs(), &cancel)?;

        let cancelled = summary.count(JobState::Cancelled);
        if cancelled > 0 {
            bail!("Interrupted with {cancelled} transient databases unfinished; rerun to resume");
        }
        let failed = summary.count(JobState::Failed);
        if failed > 0 {
            bail!("{failed} of {} transient databases failed", summary.outcomes.len());
        }
        Ok(())
    }
}
