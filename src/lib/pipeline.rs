//! Post-search processing for one job.
//!
//! The pipeline runs on the job's own thread, one step after another:
//!
//! 1. drop empty match slots and put tied candidates into canonical order
//! 2. keep the best-ranked match per (file, scan, candidate mass)
//! 3. estimate q-values
//! 4. resolve tied candidates
//! 5. optionally build and score protein groups from resolved, confident matches
//! 6. roll matches up to peptides and count everything, split by transient involvement
//! 7. freeze the results and register the output writers
//!
//! Writers only ever see the frozen results from step 7, which is after grouping has finished.

use ahash::AHashSet;
use anyhow::Result;
use fgsweep_metrics::TransientSearchMetrics;
use log::debug;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cancel::CancellationToken;
use crate::collaborators::Collaborators;
use crate::config::SweepConfig;
use crate::coordinator::WriteCoordinator;
use crate::output;
use crate::parsimony::ProteinGroup;
use crate::psm::Psm;

/// A match and whether it involves the transient database.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    /// The match
    pub psm: Psm,
    /// True if any candidate comes from the transient database
    pub transient: bool,
}

/// The best match for one peptide sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct PeptideRecord {
    /// Best-ranked match for the sequence, with the peptide-level q-value
    pub best: Psm,
    /// Number of matches resolved to the sequence
    pub psm_count: usize,
    /// True if the best match involves the transient database
    pub transient: bool,
}

/// A protein group and whether it contains a transient protein.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRecord {
    /// The group
    pub group: ProteinGroup,
    /// True if any member comes from the transient database
    pub transient: bool,
}

/// Everything one job produced, frozen before any writer runs.
#[derive(Debug, Clone, PartialEq)]
pub struct JobResults {
    /// Dataset identifier
    pub dataset_id: String,
    /// De-duplicated matches in rank order
    pub matches: Vec<MatchRecord>,
    /// Peptides in rank order of their best match
    pub peptides: Vec<PeptideRecord>,
    /// Protein groups, when grouping is enabled
    pub groups: Option<Vec<GroupRecord>>,
    /// Summary counters
    pub metrics: TransientSearchMetrics,
}

/// Per-job inputs to the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct JobContext<'a> {
    /// Dataset identifier
    pub dataset_id: &'a str,
    /// Every accession in the transient database
    pub transient_accessions: &'a AHashSet<String>,
    /// Number of proteins in the transient database
    pub transient_proteins: u64,
    /// Directory the job's outputs are written to
    pub output_dir: &'a Path,
}

/// Turns one job's raw matches into a result record and scheduled output files.
pub struct PostSearchPipeline<'a> {
    config: &'a SweepConfig,
    collaborators: &'a Collaborators,
    coordinator: &'a WriteCoordinator,
}

impl<'a> PostSearchPipeline<'a> {
    /// Creates a pipeline that registers its writers with `coordinator`.
    #[must_use]
    pub fn new(
        config: &'a SweepConfig,
        collaborators: &'a Collaborators,
        coordinator: &'a WriteCoordinator,
    ) -> Self {
        Self { config, collaborators, coordinator }
    }

    /// Processes `matches` (one slot per scan) and returns the job's summary counters. Output
    /// writers are registered but not waited for.
    ///
    /// # Errors
    /// Returns an error if the run is cancelled between steps.
    pub fn run(
        &self,
        job: &JobContext<'_>,
        matches: Vec<Option<Psm>>,
        cancel: &CancellationToken,
    ) -> Result<TransientSearchMetrics> {
        let mut psms = deduplicate(matches);
        cancel.check()?;

        self.collaborators.fdr.estimate(&mut psms, self.config.acceptor.notch_count());
        let ambiguous = self.collaborators.disambiguator.disambiguate(&mut psms);
        debug!("'{}': {} of {} matches left ambiguous", job.dataset_id, ambiguous, psms.len());
        cancel.check()?;

        let groups = self.config.grouping.then(|| self.build_groups(&psms));
        let peptides = self.roll_up_peptides(&psms);
        cancel.check()?;

        let results = summarize(job, psms, peptides, groups, self.config.q_value_threshold());
        let metrics = results.metrics.clone();
        self.register_writers(job.output_dir, Arc::new(results));
        Ok(metrics)
    }

    fn build_groups(&self, psms: &[Psm]) -> Vec<ProteinGroup> {
        let threshold = self.config.q_value_threshold();
        let eligible: Vec<&Psm> =
            psms.iter().filter(|p| !p.is_ambiguous() && p.passes(threshold)).collect();
        let parsimony = &self.collaborators.parsimony;
        let mut groups = parsimony.group(&eligible);
        parsimony.score_groups(&mut groups, &eligible);
        groups
    }

    /// Best match per resolved sequence, with peptide-level q-values estimated over those best
    /// matches only.
    fn roll_up_peptides(&self, psms: &[Psm]) -> Vec<(Psm, usize)> {
        let mut index_of: ahash::AHashMap<&str, usize> = ahash::AHashMap::new();
        let mut peptides: Vec<(Psm, usize)> = Vec::new();
        for psm in psms {
            let Some(sequence) = psm.resolved_sequence.as_deref() else { continue };
            match index_of.entry(sequence) {
                Entry::Occupied(entry) => peptides[*entry.get()].1 += 1,
                Entry::Vacant(entry) => {
                    entry.insert(peptides.len());
                    peptides.push((psm.clone(), 1));
                }
            }
        }

        let mut best: Vec<Psm> = peptides.iter().map(|(p, _)| p.clone()).collect();
        self.collaborators.fdr.estimate(&mut best, self.config.acceptor.notch_count());
        best.into_iter().zip(peptides).map(|(psm, (_, count))| (psm, count)).collect()
    }

    fn register_writers(&self, dir: &Path, results: Arc<JobResults>) {
        let filter = self.config.filter;
        let path = |name: &str| -> PathBuf { dir.join(name) };

        if !self.config.transient_results_only {
            let file = path(output::PSMS_FILE);
            self.schedule(&results, "PSM table", move |r| {
                output::write_psms(&file, r, &filter, false)
            });
            let file = path(output::PEPTIDES_FILE);
            self.schedule(&results, "peptide table", move |r| {
                output::write_peptides(&file, r, &filter, false)
            });
        }

        let file = path(output::TRANSIENT_PSMS_FILE);
        self.schedule(&results, "transient PSM table", move |r| {
            output::write_psms(&file, r, &filter, true)
        });
        let file = path(output::TRANSIENT_PEPTIDES_FILE);
        self.schedule(&results, "transient peptide table", move |r| {
            output::write_peptides(&file, r, &filter, true)
        });

        if results.groups.is_some() {
            let file = path(output::PROTEIN_GROUPS_FILE);
            self.schedule(&results, "protein groups", move |r| {
                output::write_protein_groups(&file, r, &filter)
            });
        }

        if self.config.write_spectral_library {
            let file = path(output::LIBRARY_FILE);
            let threshold = filter.q_value_threshold;
            self.schedule(&results, "spectral library", move |r| {
                output::write_library(&file, r, threshold)
            });
        }

        let file = path(output::JOB_SUMMARY_FILE);
        let threshold = filter.q_value_threshold;
        self.schedule(&results, "summary", move |r| {
            output::write_job_summary(&file, &r.metrics, threshold)
        });
    }

    fn schedule<F>(&self, results: &Arc<JobResults>, label: &str, write: F)
    where
        F: FnOnce(&JobResults) -> Result<()> + Send + 'static,
    {
        let dataset_id = results.dataset_id.clone();
        let results = Arc::clone(results);
        self.coordinator.register(&dataset_id, label, move || write(&results));
    }
}

/// Drops empty slots, canonicalizes candidates, and keeps the best-ranked match for each
/// (file, scan, candidate mass). The result is in rank order.
fn deduplicate(matches: Vec<Option<Psm>>) -> Vec<Psm> {
    let mut psms: Vec<Psm> = matches
        .into_iter()
        .flatten()
        .map(|mut psm| {
            psm.canonicalize();
            psm
        })
        .collect();
    psms.sort_by(Psm::rank_cmp);

    let mut seen: AHashSet<(String, u32, u64)> = AHashSet::with_capacity(psms.len());
    psms.retain(|psm| {
        let key =
            (psm.file_name.clone(), psm.scan_number, psm.representative().peptide_mass.to_bits());
        seen.insert(key)
    });
    psms
}

/// Builds the frozen results and their counters.
fn summarize(
    job: &JobContext<'_>,
    psms: Vec<Psm>,
    peptides: Vec<(Psm, usize)>,
    groups: Option<Vec<ProteinGroup>>,
    threshold: f64,
) -> JobResults {
    let accessions = job.transient_accessions;
    let mut m = TransientSearchMetrics::new(job.dataset_id);
    m.transient_proteins = job.transient_proteins;

    let matches: Vec<MatchRecord> = psms
        .into_iter()
        .map(|psm| {
            let transient = psm.involves(accessions);
            MatchRecord { psm, transient }
        })
        .collect();
    for record in &matches {
        let decoy = record.psm.is_decoy();
        let confident = record.psm.passes(threshold);
        m.total_psms += 1;
        m.target_psms += u64::from(!decoy);
        m.decoy_psms += u64::from(decoy);
        m.confident_target_psms += u64::from(confident && !decoy);
        m.confident_decoy_psms += u64::from(confident && decoy);
        if record.transient {
            m.transient_psms += 1;
            m.transient_target_psms += u64::from(!decoy);
            m.transient_decoy_psms += u64::from(decoy);
            m.confident_transient_target_psms += u64::from(confident && !decoy);
            m.confident_transient_decoy_psms += u64::from(confident && decoy);
        }
    }

    let peptides: Vec<PeptideRecord> = peptides
        .into_iter()
        .map(|(best, psm_count)| {
            let transient = best.involves(accessions);
            PeptideRecord { best, psm_count, transient }
        })
        .collect();
    for peptide in &peptides {
        let confident_target = peptide.best.passes(threshold) && !peptide.best.is_decoy();
        m.total_peptides += 1;
        m.confident_target_peptides += u64::from(confident_target);
        m.transient_peptides += u64::from(peptide.transient);
        m.confident_transient_target_peptides += u64::from(confident_target && peptide.transient);
    }

    let groups: Option<Vec<GroupRecord>> = groups.map(|groups| {
        groups
            .into_iter()
            .map(|group| {
                let transient = group.involves(accessions);
                GroupRecord { group, transient }
            })
            .collect()
    });
    for record in groups.iter().flatten() {
        let confident_target = record.group.passes(threshold) && !record.group.is_decoy;
        m.protein_groups += 1;
        m.confident_target_protein_groups += u64::from(confident_target);
        m.transient_protein_groups += u64::from(record.transient);
        m.confident_transient_target_protein_groups +=
            u64::from(confident_target && record.transient);
    }

    JobResults { dataset_id: job.dataset_id.to_string(), matches, peptides, groups, metrics: m }
}
