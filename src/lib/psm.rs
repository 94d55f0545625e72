//! Peptide-spectrum matches.
//!
//! A [`Psm`] holds the best-scoring candidate peptides for one scan. Several candidates may be tied
//! at the best score; they stay attached to the match until disambiguation. Confidence and
//! disambiguation annotations start as `None` ("not yet computed").

use ahash::AHashSet;
use std::cmp::Ordering;

use crate::digest::Peptide;
use crate::spectra::Scan;

/// Scores within this distance are considered tied.
pub const SCORE_TOLERANCE: f64 = 1e-9;

/// One candidate identification of a match.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Sequence annotated with variable modifications
    pub full_sequence: String,
    /// Unmodified sequence
    pub base_sequence: String,
    /// Accession of the protein the peptide came from
    pub accession: String,
    /// Theoretical peptide mass
    pub peptide_mass: f64,
    /// True if the source protein is a decoy
    pub is_decoy: bool,
    /// True if the source protein is a contaminant
    pub is_contaminant: bool,
    /// Index of the mass-difference notch that accepted the candidate
    pub notch: usize,
}

impl Candidate {
    /// Builds a candidate from an indexed peptide accepted in `notch`.
    #[must_use]
    pub fn from_peptide(peptide: &Peptide, notch: usize) -> Self {
        Self {
            full_sequence: peptide.full_sequence.clone(),
            base_sequence: peptide.base_sequence.clone(),
            accession: peptide.accession.clone(),
            peptide_mass: peptide.monoisotopic_mass,
            is_decoy: peptide.is_decoy,
            is_contaminant: peptide.is_contaminant,
            notch,
        }
    }

    fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.full_sequence
            .cmp(&other.full_sequence)
            .then_with(|| self.accession.cmp(&other.accession))
            .then_with(|| self.notch.cmp(&other.notch))
    }
}

/// The match for one scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Psm {
    /// Index of the scan in the shared, mass-sorted scan list
    pub scan_index: usize,
    /// Source file stem
    pub file_name: String,
    /// Scan number within the source file
    pub scan_number: u32,
    /// Observed precursor mass
    pub precursor_mass: f64,
    /// Precursor charge
    pub charge: u8,
    /// Retention time
    pub retention_time: f64,
    /// Search score (higher is better)
    pub score: f64,
    /// Candidates tied at `score`
    pub candidates: Vec<Candidate>,
    /// Global target-decoy q-value
    pub q_value: Option<f64>,
    /// q-value computed within this match's notch
    pub q_value_notch: Option<f64>,
    /// Full sequence chosen by disambiguation; `None` while ambiguous or not yet resolved
    pub resolved_sequence: Option<String>,
}

impl Psm {
    /// Creates a match for `scan` with a single candidate.
    #[must_use]
    pub fn new(scan_index: usize, scan: &Scan, score: f64, candidate: Candidate) -> Self {
        Self {
            scan_index,
            file_name: scan.file_name.clone(),
            scan_number: scan.scan_number,
            precursor_mass: scan.precursor_mass,
            charge: scan.charge,
            retention_time: scan.retention_time,
            score,
            candidates: vec![candidate],
            q_value: None,
            q_value_notch: None,
            resolved_sequence: None,
        }
    }

    /// Offers a new candidate: a better score replaces every existing candidate, an equal score
    /// adds a tie, and a worse score is ignored. Returns true if the match changed.
    pub fn add_or_replace(&mut self, score: f64, candidate: Candidate) -> bool {
        if score > self.score + SCORE_TOLERANCE {
            self.score = score;
            self.candidates.clear();
            self.candidates.push(candidate);
            true
        } else if (score - self.score).abs() <= SCORE_TOLERANCE
            && !self.candidates.contains(&candidate)
        {
            self.candidates.push(candidate);
            true
        } else {
            false
        }
    }

    /// Clears confidence and disambiguation annotations.
    pub fn reset_annotations(&mut self) {
        self.q_value = None;
        self.q_value_notch = None;
        self.resolved_sequence = None;
    }

    /// Sorts tied candidates into canonical order and removes exact duplicates, so that
    /// [`representative`](Self::representative) is deterministic.
    pub fn canonicalize(&mut self) {
        self.candidates.sort_by(Candidate::canonical_cmp);
        self.candidates.dedup_by(|a, b| a.canonical_cmp(b) == Ordering::Equal);
    }

    /// The canonical candidate. Matches always carry at least one candidate.
    #[must_use]
    pub fn representative(&self) -> &Candidate {
        &self.candidates[0]
    }

    /// Notch of the representative candidate.
    #[must_use]
    pub fn notch(&self) -> usize {
        self.representative().notch
    }

    /// True if any candidate comes from a decoy protein.
    #[must_use]
    pub fn is_decoy(&self) -> bool {
        self.candidates.iter().any(|c| c.is_decoy)
    }

    /// True if any candidate comes from a contaminant protein.
    #[must_use]
    pub fn is_contaminant(&self) -> bool {
        self.candidates.iter().any(|c| c.is_contaminant)
    }

    /// True until disambiguation has chosen a single sequence.
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        self.resolved_sequence.is_none()
    }

    /// True if the match's q-value is known and at or below `threshold`.
    #[must_use]
    pub fn passes(&self, threshold: f64) -> bool {
        self.q_value.is_some_and(|q| q <= threshold)
    }

    /// True if any candidate references an accession in `accessions`.
    #[must_use]
    pub fn involves(&self, accessions: &AHashSet<String>) -> bool {
        self.candidates.iter().any(|c| accessions.contains(&c.accession))
    }

    /// Sequence used for reporting: the resolved sequence, or all tied sequences joined by `|`.
    #[must_use]
    pub fn display_sequence(&self) -> String {
        match &self.resolved_sequence {
            Some(sequence) => sequence.clone(),
            None => join_unique(self.candidates.iter().map(|c| c.full_sequence.as_str())),
        }
    }

    /// Accessions of all candidates joined by `|`.
    #[must_use]
    pub fn accessions(&self) -> String {
        join_unique(self.candidates.iter().map(|c| c.accession.as_str()))
    }

    /// Search ranking: higher score first, then fewer tied candidates, then scan order.
    #[must_use]
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.candidates.len().cmp(&other.candidates.len()))
            .then_with(|| self.scan_index.cmp(&other.scan_index))
    }
}

fn join_unique<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen.join("|")
}
