//! The shared search context.
//!
//! Everything every job needs and nothing any job may change: modifications, the baseline
//! database, all scans sorted by precursor mass, and the result of the single baseline search.
//! The context is built once, before the first job starts, and is then only read. Jobs obtain
//! their own mutable copy of the baseline matches through
//! [`SharedSearchContext::snapshot_matches`].

use anyhow::{Context, Result};
use log::info;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::cancel::CancellationToken;
use crate::collaborators::Collaborators;
use crate::config::SweepConfig;
use crate::database::{Database, DatabaseDescriptor};
use crate::digest::PeptideIndex;
use crate::logging::OperationTimer;
use crate::modification::Modifications;
use crate::psm::Psm;
use crate::spectra::Scan;

/// Immutable state shared by every job of a run.
#[derive(Debug)]
pub struct SharedSearchContext {
    modifications: Modifications,
    baseline: Database,
    scans: Vec<Scan>,
    baseline_matches: Vec<Option<Psm>>,
}

impl SharedSearchContext {
    /// Builds the context: loads modifications, the baseline database, and every spectra source,
    /// then searches the baseline once against all scans.
    ///
    /// The baseline search uses all `config.threads`; spectra loading uses `config.load_threads`.
    ///
    /// # Errors
    /// Returns an error if any input cannot be loaded, the search fails, or the run is cancelled.
    pub fn build(
        baseline: &DatabaseDescriptor,
        modifications: Option<&Path>,
        spectra: &[PathBuf],
        config: &SweepConfig,
        collaborators: &Collaborators,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let modifications = match modifications {
            Some(path) => collaborators
                .databases
                .load_modifications(path)
                .with_context(|| format!("Failed to load modifications: {}", path.display()))?,
            None => Modifications::default(),
        };
        info!("Loaded {} modifications", modifications.len());

        let baseline_db = collaborators
            .databases
            .load_database(baseline)
            .with_context(|| format!("Failed to load baseline: {}", baseline.path.display()))?;
        info!(
            "Loaded baseline database '{}' with {} proteins ({} targets)",
            baseline_db.id,
            baseline_db.len(),
            baseline_db.target_count()
        );
        cancel.check()?;

        let scans = load_sorted_scans(spectra, config.load_threads, collaborators)?;
        cancel.check()?;

        let timer = OperationTimer::new("Searching baseline database");
        let index = PeptideIndex::build(&baseline_db, &modifications, &config.digestion);
        let mut baseline_matches = vec![None; scans.len()];
        let stats = collaborators.search.search(
            &scans,
            &index,
            &mut baseline_matches,
            config.threads,
            cancel,
        )?;
        timer.log_completion(stats.matches_updated);

        Ok(Self { modifications, baseline: baseline_db, scans, baseline_matches })
    }

    /// Loaded modification definitions.
    #[must_use]
    pub fn modifications(&self) -> &Modifications {
        &self.modifications
    }

    /// The baseline database.
    #[must_use]
    pub fn baseline(&self) -> &Database {
        &self.baseline
    }

    /// Every scan, sorted ascending by precursor mass.
    #[must_use]
    pub fn scans(&self) -> &[Scan] {
        &self.scans
    }

    /// Baseline matches, index-aligned with [`scans`](Self::scans).
    #[must_use]
    pub fn baseline_matches(&self) -> &[Option<Psm>] {
        &self.baseline_matches
    }

    /// A structurally independent copy of the baseline matches with every confidence and
    /// disambiguation annotation reset.
    #[must_use]
    pub fn snapshot_matches(&self) -> Vec<Option<Psm>> {
        self.baseline_matches
            .iter()
            .map(|slot| {
                slot.clone().map(|mut psm| {
                    psm.reset_annotations();
                    psm
                })
            })
            .collect()
    }
}

/// Loads every spectra source on a pool of `threads` and merges the scans, sorted by precursor
/// mass (ties broken by source and scan number).
fn load_sorted_scans(
    spectra: &[PathBuf],
    threads: usize,
    collaborators: &Collaborators,
) -> Result<Vec<Scan>> {
    let timer = OperationTimer::new("Loading spectra");
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(|i| format!("fgsweep-load-{i}"))
        .build()
        .context("Failed to build spectra loading thread pool")?;

    let scans = pool.install(|| -> Result<Vec<Scan>> {
        let per_source: Vec<Vec<Scan>> = spectra
            .par_iter()
            .map(|path| {
                collaborators
                    .spectra
                    .load(path)
                    .with_context(|| format!("Failed to load spectra: {}", path.display()))
            })
            .collect::<Result<_>>()?;
        let mut scans: Vec<Scan> = per_source.into_iter().flatten().collect();
        scans.par_sort_by(|a, b| {
            a.precursor_mass
                .total_cmp(&b.precursor_mass)
                .then_with(|| a.file_name.cmp(&b.file_name))
                .then_with(|| a.scan_number.cmp(&b.scan_number))
        });
        Ok(scans)
    })?;

    timer.log_completion(scans.len() as u64);
    Ok(scans)
}
