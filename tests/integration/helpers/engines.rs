//! Search engines that observe or interfere with a run.

use anyhow::Result;
use fgsweep_lib::cancel::CancellationToken;
use fgsweep_lib::collaborators::Collaborators;
use fgsweep_lib::config::SweepConfig;
use fgsweep_lib::digest::PeptideIndex;
use fgsweep_lib::psm::Psm;
use fgsweep_lib::scheduler::JobScheduler;
use fgsweep_lib::search::{PrecursorSearch, SearchEngine, SearchStats};
use fgsweep_lib::spectra::Scan;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts search calls and forwards them to a [`PrecursorSearch`].
///
/// Optionally sets a cancellation token once a number of calls have been made.
#[derive(Default)]
pub struct CountingSearch {
    inner: PrecursorSearch,
    calls: AtomicUsize,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl CountingSearch {
    /// Cancels `token` once `calls` searches have finished.
    pub fn cancelling_after(calls: usize, token: CancellationToken) -> Self {
        Self { cancel_after: Some((calls, token)), ..Self::default() }
    }

    /// Number of searches made so far, including the baseline search.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SearchEngine for CountingSearch {
    fn search(
        &self,
        scans: &[Scan],
        peptides: &PeptideIndex,
        matches: &mut [Option<Psm>],
        threads: usize,
        cancel: &CancellationToken,
    ) -> Result<SearchStats> {
        let stats = self.inner.search(scans, peptides, matches, threads, cancel)?;
        let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, token)) = &self.cancel_after {
            if calls >= *after {
                token.cancel();
            }
        }
        Ok(stats)
    }
}

/// Configuration used by most tests: two jobs at a time on two threads.
///
/// Missed cleavages are disabled so that no reversed decoy peptide has the same composition as a
/// target peptide.
pub fn test_config() -> SweepConfig {
    let mut config = SweepConfig {
        max_concurrent_jobs: 2,
        threads: 2,
        load_threads: 1,
        ..SweepConfig::default()
    };
    config.digestion.max_missed_cleavages = 0;
    config
}

/// A scheduler whose searches go through `search`.
pub fn scheduler_with(config: SweepConfig, search: &Arc<CountingSearch>) -> JobScheduler {
    let collaborators = Collaborators::from_config(&config).with_search(search.clone());
    JobScheduler::new(config, collaborators)
}
