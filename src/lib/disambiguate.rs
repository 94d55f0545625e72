//! Resolution of matches carrying several tied candidates.

use crate::psm::Psm;

/// Collapses tied candidates to a single resolved identification where possible.
pub trait Disambiguator: Send + Sync {
    /// Sets `resolved_sequence` on every match in `psms` that can be resolved. Returns the number
    /// of matches left ambiguous.
    fn disambiguate(&self, psms: &mut [Psm]) -> usize;
}

/// Resolves a match when every tied candidate has the same peptide sequence, treating isoleucine
/// and leucine as indistinguishable. Candidates from different proteins are kept so that protein
/// inference still sees every possible source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceDisambiguator;

impl Disambiguator for SequenceDisambiguator {
    fn disambiguate(&self, psms: &mut [Psm]) -> usize {
        let mut ambiguous = 0;
        for psm in psms.iter_mut() {
            let first = normalize(&psm.representative().full_sequence);
            if psm.candidates.iter().all(|c| normalize(&c.full_sequence) == first) {
                psm.resolved_sequence = Some(psm.representative().full_sequence.clone());
            } else {
                psm.resolved_sequence = None;
                ambiguous += 1;
            }
        }
        ambiguous
    }
}

fn normalize(sequence: &str) -> String {
    sequence.chars().map(|c| if c == 'I' { 'L' } else { c }).collect()
}
