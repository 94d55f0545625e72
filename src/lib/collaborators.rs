//! The pluggable components the scheduler drives.

use std::sync::Arc;

use crate::config::SweepConfig;
use crate::database::{DatabaseLoader, FastaLoader};
use crate::disambiguate::{Disambiguator, SequenceDisambiguator};
use crate::fdr::{FdrEstimator, TargetDecoyFdr};
use crate::parsimony::{GreedyParsimony, ParsimonyEngine};
use crate::search::{PrecursorSearch, SearchEngine};
use crate::spectra::{SpectraLoader, TsvSpectraLoader};

/// Loading, search, and statistics implementations shared by every job.
#[derive(Clone)]
pub struct Collaborators {
    /// Loads protein databases and modification definitions
    pub databases: Arc<dyn DatabaseLoader>,
    /// Loads spectra sources
    pub spectra: Arc<dyn SpectraLoader>,
    /// Matches scans against peptides
    pub search: Arc<dyn SearchEngine>,
    /// Annotates matches with q-values
    pub fdr: Arc<dyn FdrEstimator>,
    /// Resolves tied candidates
    pub disambiguator: Arc<dyn Disambiguator>,
    /// Builds and scores protein groups
    pub parsimony: Arc<dyn ParsimonyEngine>,
}

impl Collaborators {
    /// The built-in implementations, configured from `config`.
    #[must_use]
    pub fn from_config(config: &SweepConfig) -> Self {
        Self {
            databases: Arc::new(FastaLoader::new(config.decoy_handling)),
            spectra: Arc::new(TsvSpectraLoader),
            search: Arc::new(PrecursorSearch::new(config.acceptor.clone())),
            fdr: Arc::new(TargetDecoyFdr),
            disambiguator: Arc::new(SequenceDisambiguator),
            parsimony: Arc::new(GreedyParsimony),
        }
    }

    /// Replaces the search engine.
    #[must_use]
    pub fn with_search(mut self, search: Arc<dyn SearchEngine>) -> Self {
        self.search = search;
        self
    }

    /// Replaces the database loader.
    #[must_use]
    pub fn with_databases(mut self, databases: Arc<dyn DatabaseLoader>) -> Self {
        self.databases = databases;
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
