//! Modification definitions.
//!
//! Modifications are read from a TSV file with the columns `id`, `residue`, `mass_shift`, and
//! `kind` (`fixed` or `variable`). Fixed modifications are applied to every matching residue during
//! digestion; variable modifications produce additional peptide forms.

use anyhow::{Context, Result};
use fgoxide::io::DelimFile;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Whether a modification is always applied or optionally applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModificationKind {
    /// Applied to every occurrence of the residue
    Fixed,
    /// Applied to at most one residue per peptide
    Variable,
}

/// A single residue modification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modification {
    /// Short identifier used when annotating sequences (e.g. "Oxidation")
    pub id: String,
    /// Single-letter residue the modification applies to
    pub residue: char,
    /// Monoisotopic mass shift in daltons
    pub mass_shift: f64,
    /// Fixed or variable
    pub kind: ModificationKind,
}

/// The fixed and variable modifications used for a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modifications {
    /// Modifications applied to every matching residue
    pub fixed: Vec<Modification>,
    /// Modifications applied optionally
    pub variable: Vec<Modification>,
}

impl Modifications {
    /// Splits a list of definitions into fixed and variable modifications.
    #[must_use]
    pub fn from_definitions(definitions: Vec<Modification>) -> Self {
        let (fixed, variable) =
            definitions.into_iter().partition(|m| m.kind == ModificationKind::Fixed);
        Self { fixed, variable }
    }

    /// Reads modification definitions from a TSV file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a row cannot be parsed.
    pub fn from_tsv(path: &Path) -> Result<Self> {
        let definitions: Vec<Modification> = DelimFile::default()
            .read_tsv(path)
            .with_context(|| format!("Failed to read modifications: {}", path.display()))?;
        Ok(Self::from_definitions(definitions))
    }

    /// Total fixed mass shift applied to `residue`.
    #[must_use]
    pub fn fixed_shift(&self, residue: char) -> f64 {
        self.fixed.iter().filter(|m| m.residue == residue).map(|m| m.mass_shift).sum()
    }

    /// Number of modification definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fixed.len() + self.variable.len()
    }

    /// True if no modifications are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
