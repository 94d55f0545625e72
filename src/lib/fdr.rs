//! Target-decoy confidence estimation.
//!
//! Matches are ranked by score and, walking down the ranking, the false-discovery rate at each
//! position is estimated as `decoys / targets`. The q-value of a match is the smallest FDR at or
//! below its position, so q-values never decrease as scores fall.

use crate::psm::Psm;

/// Annotates matches in place with confidence values.
pub trait FdrEstimator: Send + Sync {
    /// Sets `q_value` and `q_value_notch` on every match in `psms`.
    ///
    /// `notch_count` is the number of mass-difference bins the search tolerance recognizes;
    /// per-notch q-values are computed within each bin. The order of `psms` is not changed.
    fn estimate(&self, psms: &mut [Psm], notch_count: usize);
}

/// Classic target-decoy q-values, computed globally and per notch.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetDecoyFdr;

impl FdrEstimator for TargetDecoyFdr {
    fn estimate(&self, psms: &mut [Psm], notch_count: usize) {
        let entries: Vec<(f64, bool)> = psms.iter().map(|p| (p.score, p.is_decoy())).collect();
        for (psm, q) in psms.iter_mut().zip(target_decoy_q_values(&entries)) {
            psm.q_value = Some(q);
        }

        // Matches whose notch falls outside the acceptor's range share the last bin.
        let bins = notch_count.max(1);
        let mut by_notch: Vec<Vec<usize>> = vec![Vec::new(); bins];
        for (index, psm) in psms.iter().enumerate() {
            by_notch[psm.notch().min(bins - 1)].push(index);
        }
        for members in by_notch.iter().filter(|m| !m.is_empty()) {
            let entries: Vec<(f64, bool)> =
                members.iter().map(|&i| (psms[i].score, psms[i].is_decoy())).collect();
            for (&index, q) in members.iter().zip(target_decoy_q_values(&entries)) {
                psms[index].q_value_notch = Some(q);
            }
        }
    }
}

/// Computes target-decoy q-values for `(score, is_decoy)` entries, returned in input order.
///
/// At equal scores decoys are counted first, which keeps the estimate conservative.
#[must_use]
pub fn target_decoy_q_values(entries: &[(f64, bool)]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&a, &b| {
        let (score_a, decoy_a) = entries[a];
        let (score_b, decoy_b) = entries[b];
        score_b.total_cmp(&score_a).then_with(|| decoy_b.cmp(&decoy_a)).then_with(|| a.cmp(&b))
    });

    let mut fdr = Vec::with_capacity(order.len());
    let (mut targets, mut decoys) = (0u64, 0u64);
    for &index in &order {
        if entries[index].1 {
            decoys += 1;
        } else {
            targets += 1;
        }
        fdr.push((decoys as f64 / targets.max(1) as f64).min(1.0));
    }

    let mut q_values = vec![0.0; entries.len()];
    let mut running_min = 1.0_f64;
    for (rank, &index) in order.iter().enumerate().rev() {
        running_min = running_min.min(fdr[rank]);
        q_values[index] = running_min;
    }
    q_values
}
