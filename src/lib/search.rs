//! Spectrum search.
//!
//! A [`SearchEngine`] compares every scan against a [`PeptideIndex`] and updates the scan's match
//! slot in place. Slots already holding a match (from an earlier search against another database)
//! are only replaced or extended when the new index produces an equal or better candidate, so a
//! search can be restricted to a small database while keeping the best results of a larger one.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::cancel::CancellationToken;
use crate::digest::PeptideIndex;
use crate::errors::SweepError;
use crate::psm::{Candidate, Psm, SCORE_TOLERANCE};
use crate::spectra::Scan;

/// Mass difference between the C13 and C12 isotopes.
pub const C13_C12_DIFFERENCE: f64 = 1.003_354_835_2;

/// Accepts candidate peptides whose mass, shifted by one of a set of notches, lies within a ppm
/// tolerance of the observed precursor mass.
#[derive(Debug, Clone, PartialEq)]
pub struct MassDiffAcceptor {
    /// Tolerance in parts per million
    pub tolerance_ppm: f64,
    /// Accepted mass differences (observed minus theoretical), in daltons
    pub notches: Vec<f64>,
}

impl Default for MassDiffAcceptor {
    fn default() -> Self {
        Self { tolerance_ppm: 10.0, notches: vec![0.0] }
    }
}

impl MassDiffAcceptor {
    /// Number of distinct mass-difference bins.
    #[must_use]
    pub fn notch_count(&self) -> usize {
        self.notches.len()
    }

    /// Theoretical mass window searched for `notch` given an observed precursor mass.
    #[must_use]
    pub fn window(&self, precursor_mass: f64, notch: usize) -> (f64, f64) {
        let center = precursor_mass - self.notches[notch];
        let delta = center * self.tolerance_ppm / 1e6;
        (center - delta, center + delta)
    }

    /// Mass error of `peptide_mass` against the notch-shifted precursor, in ppm.
    #[must_use]
    pub fn ppm_error(&self, precursor_mass: f64, peptide_mass: f64, notch: usize) -> f64 {
        let shifted = precursor_mass - self.notches[notch];
        (shifted - peptide_mass) / peptide_mass * 1e6
    }
}

/// Counters reported by one search pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Scans compared against the index
    pub scans_searched: u64,
    /// Candidate peptides scored
    pub candidates_scored: u64,
    /// Match slots created, replaced, or extended with a tie
    pub matches_updated: u64,
}

/// Matches scans against a peptide index.
pub trait SearchEngine: Send + Sync {
    /// Searches `scans` against `peptides`, updating `matches` (index-aligned with `scans`).
    ///
    /// `threads` bounds the parallelism of this call. Implementations poll `cancel` while running
    /// and return [`SweepError::Cancelled`] if it is set.
    ///
    /// # Errors
    /// Returns an error if the search cannot run or was cancelled.
    fn search(
        &self,
        scans: &[Scan],
        peptides: &PeptideIndex,
        matches: &mut [Option<Psm>],
        threads: usize,
        cancel: &CancellationToken,
    ) -> Result<SearchStats>;
}

/// Scores candidates by precursor mass error alone.
///
/// The score is `1 - |ppm error| / tolerance`, less 0.01 per notch index so that the monoisotopic
/// notch wins over isotope-error notches at equal error.
#[derive(Debug, Clone, Default)]
pub struct PrecursorSearch {
    acceptor: MassDiffAcceptor,
}

impl PrecursorSearch {
    /// Creates a search using `acceptor`.
    #[must_use]
    pub fn new(acceptor: MassDiffAcceptor) -> Self {
        Self { acceptor }
    }

    /// Best candidates for one scan, with their shared score.
    fn best_candidates(
        &self,
        scan: &Scan,
        peptides: &PeptideIndex,
    ) -> (u64, Option<(f64, Vec<Candidate>)>) {
        let mut scored = 0;
        let mut best: Option<(f64, Vec<Candidate>)> = None;
        for notch in 0..self.acceptor.notch_count() {
            let (low, high) = self.acceptor.window(scan.precursor_mass, notch);
            for peptide in peptides.in_range(low, high) {
                scored += 1;
                let ppm =
                    self.acceptor.ppm_error(scan.precursor_mass, peptide.monoisotopic_mass, notch);
                #[allow(clippy::cast_precision_loss)]
                let score = 1.0 - ppm.abs() / self.acceptor.tolerance_ppm - 0.01 * notch as f64;
                let candidate = Candidate::from_peptide(peptide, notch);

                let replace = best.as_ref().is_none_or(|(b, _)| score > *b + SCORE_TOLERANCE);
                if replace {
                    best = Some((score, vec![candidate]));
                } else if let Some((b, tied)) = best.as_mut() {
                    if (score - *b).abs() <= SCORE_TOLERANCE {
                        tied.push(candidate);
                    }
                }
            }
        }
        (scored, best)
    }
}

impl SearchEngine for PrecursorSearch {
    fn search(
        &self,
        scans: &[Scan],
        peptides: &PeptideIndex,
        matches: &mut [Option<Psm>],
        threads: usize,
        cancel: &CancellationToken,
    ) -> Result<SearchStats> {
        anyhow::ensure!(
            scans.len() == matches.len(),
            "Match slots ({}) are not aligned with scans ({})",
            matches.len(),
            scans.len()
        );
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("fgsweep-search-{i}"))
            .build()
            .context("Failed to build search thread pool")?;

        let searched = AtomicU64::new(0);
        let scored = AtomicU64::new(0);
        let updated = AtomicU64::new(0);

        pool.install(|| {
            matches.par_iter_mut().zip(scans.par_iter()).enumerate().for_each(
                |(index, (slot, scan))| {
                    if cancel.is_cancelled() {
                        return;
                    }
                    searched.fetch_add(1, Ordering::Relaxed);
                    let (count, best) = self.best_candidates(scan, peptides);
                    scored.fetch_add(count, Ordering::Relaxed);
                    let Some((score, candidates)) = best else { return };

                    let changed = match slot {
                        Some(existing) => candidates.into_iter().fold(false, |changed, c| {
                            existing.add_or_replace(score, c) || changed
                        }),
                        None => {
                            let mut iter = candidates.into_iter();
                            if let Some(first) = iter.next() {
                                let mut psm = Psm::new(index, scan, score, first);
                                psm.candidates.extend(iter);
                                *slot = Some(psm);
                            }
                            true
                        }
                    };
                    if changed {
                        updated.fetch_add(1, Ordering::Relaxed);
                    }
                },
            );
        });

        if cancel.is_cancelled() {
            return Err(SweepError::Cancelled.into());
        }
        Ok(SearchStats {
            scans_searched: searched.into_inner(),
            candidates_scored: scored.into_inner(),
            matches_updated: updated.into_inner(),
        })
    }
}
