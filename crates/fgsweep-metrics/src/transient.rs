//! Per-dataset metrics for transient database searches.
//!
//! One [`TransientSearchMetrics`] row is produced for every transient database that completes its
//! search. The same rows are used for the resumable incremental results file and for the full
//! end-of-run dump.

use serde::{Deserialize, Serialize};

use crate::Metric;

/// Summary counters for one transient database search.
///
/// "Transient" counters are restricted to matches with at least one candidate protein from the
/// transient database. "Confident" counters are restricted to matches (or peptides, or groups) at
/// or below the configured q-value threshold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransientSearchMetrics {
    /// Identifier of the transient database (its file stem)
    pub dataset_id: String,

    /// Number of proteins (targets and decoys) in the transient database
    pub transient_proteins: u64,

    /// Matches surviving empty-slot removal and de-duplication
    pub total_psms: u64,
    /// Target matches among `total_psms`
    pub target_psms: u64,
    /// Decoy matches among `total_psms`
    pub decoy_psms: u64,

    /// Target matches at or below the q-value threshold
    pub confident_target_psms: u64,
    /// Decoy matches at or below the q-value threshold
    pub confident_decoy_psms: u64,

    /// Matches involving the transient database
    pub transient_psms: u64,
    /// Target matches involving the transient database
    pub transient_target_psms: u64,
    /// Decoy matches involving the transient database
    pub transient_decoy_psms: u64,

    /// Confident target matches involving the transient database
    pub confident_transient_target_psms: u64,
    /// Confident decoy matches involving the transient database
    pub confident_transient_decoy_psms: u64,

    /// Distinct peptides after roll-up
    pub total_peptides: u64,
    /// Confident target peptides
    pub confident_target_peptides: u64,
    /// Peptides involving the transient database
    pub transient_peptides: u64,
    /// Confident target peptides involving the transient database
    pub confident_transient_target_peptides: u64,

    /// Protein groups (zero when grouping is disabled)
    pub protein_groups: u64,
    /// Confident target protein groups
    pub confident_target_protein_groups: u64,
    /// Protein groups containing at least one transient protein
    pub transient_protein_groups: u64,
    /// Confident target protein groups containing at least one transient protein
    pub confident_transient_target_protein_groups: u64,
}

impl TransientSearchMetrics {
    /// Creates an empty metrics row for the given dataset.
    #[must_use]
    pub fn new(dataset_id: impl Into<String>) -> Self {
        Self { dataset_id: dataset_id.into(), ..Default::default() }
    }

    /// Total number of confident matches (targets and decoys).
    #[must_use]
    pub fn confident_psms(&self) -> u64 {
        self.confident_target_psms + self.confident_decoy_psms
    }

    /// Adds every counter of `other` into `self`, leaving `dataset_id` untouched.
    ///
    /// Used to build run-level totals across datasets.
    pub fn accumulate(&mut self, other: &Self) {
        self.transient_proteins += other.transient_proteins;
        self.total_psms += other.total_psms;
        self.target_psms += other.target_psms;
        self.decoy_psms += other.decoy_psms;
        self.confident_target_psms += other.confident_target_psms;
        self.confident_decoy_psms += other.confident_decoy_psms;
        self.transient_psms += other.transient_psms;
        self.transient_target_psms += other.transient_target_psms;
        self.transient_decoy_psms += other.transient_decoy_psms;
        self.confident_transient_target_psms += other.confident_transient_target_psms;
        self.confident_transient_decoy_psms += other.confident_transient_decoy_psms;
        self.total_peptides += other.total_peptides;
        self.confident_target_peptides += other.confident_target_peptides;
        self.transient_peptides += other.transient_peptides;
        self.confident_transient_target_peptides += other.confident_transient_target_peptides;
        self.protein_groups += other.protein_groups;
        self.confident_target_protein_groups += other.confident_target_protein_groups;
        self.transient_protein_groups += other.transient_protein_groups;
        self.confident_transient_target_protein_groups +=
            other.confident_transient_target_protein_groups;
    }
}

impl Metric for TransientSearchMetrics {
    fn metric_name() -> &'static str {
        "transient search"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let metrics = TransientSearchMetrics::new("db");
        assert_eq!(metrics.dataset_id, "db");
        assert_eq!(metrics.total_psms, 0);
        assert_eq!(metrics.confident_psms(), 0);
    }

    #[test]
    fn test_accumulate_keeps_identifier() {
        let mut total = TransientSearchMetrics::new("all");
        let mut a = TransientSearchMetrics::new("a");
        a.total_psms = 10;
        a.confident_target_psms = 4;
        a.confident_decoy_psms = 1;
        let mut b = TransientSearchMetrics::new("b");
        b.total_psms = 5;
        b.protein_groups = 2;

        total.accumulate(&a);
        total.accumulate(&b);

        assert_eq!(total.dataset_id, "all");
        assert_eq!(total.total_psms, 15);
        assert_eq!(total.confident_psms(), 5);
        assert_eq!(total.protein_groups, 2);
    }
}
