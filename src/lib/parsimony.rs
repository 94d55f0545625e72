//! Protein inference.
//!
//! Matches are rolled up into the smallest set of protein groups that explains every observed
//! peptide. Proteins supported by exactly the same peptides are indistinguishable and share a
//! group.

use ahash::{AHashMap, AHashSet};
use std::collections::{BTreeMap, BTreeSet};

use crate::fdr::target_decoy_q_values;
use crate::psm::Psm;

/// A set of indistinguishable proteins and the peptides that support them.
#[derive(Debug, Clone, PartialEq)]
pub struct ProteinGroup {
    /// Member accessions, sorted
    pub accessions: Vec<String>,
    /// Supporting peptide sequences, sorted
    pub peptides: Vec<String>,
    /// Group score; `0.0` until scored
    pub score: f64,
    /// True if every member is a decoy
    pub is_decoy: bool,
    /// True if any member is a contaminant
    pub is_contaminant: bool,
    /// Target-decoy q-value; `None` until scored
    pub q_value: Option<f64>,
}

impl ProteinGroup {
    /// True if any member accession is in `accessions`.
    #[must_use]
    pub fn involves(&self, accessions: &AHashSet<String>) -> bool {
        self.accessions.iter().any(|a| accessions.contains(a))
    }

    /// True if the group's q-value is known and at or below `threshold`.
    #[must_use]
    pub fn passes(&self, threshold: f64) -> bool {
        self.q_value.is_some_and(|q| q <= threshold)
    }
}

/// Groups matches into proteins and scores the groups.
pub trait ParsimonyEngine: Send + Sync {
    /// Builds protein groups from resolved, confident matches.
    fn group(&self, psms: &[&Psm]) -> Vec<ProteinGroup>;

    /// Sets `score` and `q_value` on every group, using the matches that built them.
    fn score_groups(&self, groups: &mut [ProteinGroup], psms: &[&Psm]);
}

/// Greedy set cover over peptide evidence.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyParsimony;

#[derive(Default)]
struct ProteinEvidence {
    peptides: BTreeSet<String>,
    is_decoy: bool,
    is_contaminant: bool,
}

impl ParsimonyEngine for GreedyParsimony {
    fn group(&self, psms: &[&Psm]) -> Vec<ProteinGroup> {
        let mut evidence: BTreeMap<String, ProteinEvidence> = BTreeMap::new();
        for psm in psms {
            let peptide = psm.display_sequence();
            for candidate in &psm.candidates {
                let entry = evidence.entry(candidate.accession.clone()).or_default();
                entry.peptides.insert(peptide.clone());
                entry.is_decoy = candidate.is_decoy;
                entry.is_contaminant |= candidate.is_contaminant;
            }
        }

        // Merge proteins with identical evidence.
        let mut merged: BTreeMap<BTreeSet<String>, Vec<String>> = BTreeMap::new();
        for (accession, protein) in &evidence {
            merged.entry(protein.peptides.clone()).or_default().push(accession.clone());
        }
        let mut candidates: Vec<(BTreeSet<String>, Vec<String>)> = merged.into_iter().collect();

        let mut covered: BTreeSet<String> = BTreeSet::new();
        let mut groups = Vec::new();
        loop {
            let best = candidates
                .iter()
                .enumerate()
                .map(|(i, (peptides, accessions))| {
                    (i, peptides.difference(&covered).count(), &accessions[0])
                })
                .filter(|(_, new, _)| *new > 0)
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.2.cmp(a.2)));
            let Some((index, _, _)) = best else { break };

            let (peptides, accessions) = candidates.swap_remove(index);
            covered.extend(peptides.iter().cloned());
            groups.push(ProteinGroup {
                is_decoy: accessions.iter().all(|a| evidence[a].is_decoy),
                is_contaminant: accessions.iter().any(|a| evidence[a].is_contaminant),
                accessions,
                peptides: peptides.into_iter().collect(),
                score: 0.0,
                q_value: None,
            });
        }
        groups
    }

    fn score_groups(&self, groups: &mut [ProteinGroup], psms: &[&Psm]) {
        let mut best: AHashMap<String, f64> = AHashMap::new();
        for psm in psms {
            let score = best.entry(psm.display_sequence()).or_insert(f64::MIN);
            *score = score.max(psm.score);
        }
        for group in groups.iter_mut() {
            group.score = group.peptides.iter().filter_map(|p| best.get(p)).sum();
        }

        let entries: Vec<(f64, bool)> = groups.iter().map(|g| (g.score, g.is_decoy)).collect();
        for (group, q) in groups.iter_mut().zip(target_decoy_q_values(&entries)) {
            group.q_value = Some(q);
        }
    }
}
