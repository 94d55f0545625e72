//! Protein databases and their loading.
//!
//! A [`Database`] is a named collection of [`Protein`]s read from a FASTA file (optionally
//! gzip-compressed). Decoys are generated by reversing each target sequence while keeping an
//! initiator methionine in place. Proteins whose accession starts with [`CONTAMINANT_PREFIX`], or
//! every protein of a database flagged as a contaminant database, are marked as contaminants.

use ahash::AHashSet;
use anyhow::{Context, Result};
use clap::ValueEnum;
use fgoxide::io::Io;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::errors::SweepError;
use crate::modification::Modifications;

/// Accession prefix given to generated decoy proteins.
pub const DECOY_PREFIX: &str = "DECOY_";

/// Accession prefix that marks a protein as a contaminant.
pub const CONTAMINANT_PREFIX: &str = "CON_";

/// How decoy proteins are produced for target-decoy confidence estimation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DecoyHandling {
    /// Do not generate decoys.
    #[value(name = "none")]
    None,
    /// Reverse each target sequence, keeping a leading methionine in place.
    #[default]
    #[value(name = "reverse")]
    Reverse,
}

/// A single protein entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protein {
    /// Protein accession (unique within a database)
    pub accession: String,
    /// Amino-acid sequence
    pub sequence: String,
    /// True for generated decoys
    pub is_decoy: bool,
    /// True for contaminant proteins
    pub is_contaminant: bool,
}

impl Protein {
    /// Creates a target protein.
    #[must_use]
    pub fn target(accession: impl Into<String>, sequence: impl Into<String>) -> Self {
        let accession = accession.into();
        let is_contaminant = accession.starts_with(CONTAMINANT_PREFIX);
        Self { accession, sequence: sequence.into(), is_decoy: false, is_contaminant }
    }

    /// Builds the reversed decoy counterpart of this protein.
    #[must_use]
    pub fn reversed_decoy(&self) -> Self {
        let sequence = match self.sequence.strip_prefix('M') {
            Some(rest) => std::iter::once('M').chain(rest.chars().rev()).collect(),
            None => self.sequence.chars().rev().collect(),
        };
        Self {
            accession: format!("{DECOY_PREFIX}{}", self.accession),
            sequence,
            is_decoy: true,
            is_contaminant: self.is_contaminant,
        }
    }
}

/// A named collection of proteins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Database {
    /// Dataset identifier
    pub id: String,
    /// Target and decoy proteins
    pub proteins: Vec<Protein>,
}

impl Database {
    /// The set of every accession in the database, for constant-time membership tests.
    #[must_use]
    pub fn accessions(&self) -> AHashSet<String> {
        self.proteins.iter().map(|p| p.accession.clone()).collect()
    }

    /// Number of target proteins.
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.proteins.iter().filter(|p| !p.is_decoy).count()
    }

    /// Number of proteins (targets and decoys).
    #[must_use]
    pub fn len(&self) -> usize {
        self.proteins.len()
    }

    /// True if the database holds no proteins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proteins.is_empty()
    }
}

/// Describes one database input: where it lives and how to treat it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseDescriptor {
    /// Path to the FASTA file
    pub path: PathBuf,
    /// Whether decoys should be generated for this database
    pub include_decoys: bool,
    /// Whether every protein in this database is a contaminant
    pub is_contaminant: bool,
}

impl DatabaseDescriptor {
    /// Creates a descriptor for a non-contaminant database.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, include_decoys: bool) -> Self {
        Self { path: path.into(), include_decoys, is_contaminant: false }
    }

    /// Dataset identifier: the file name with `.gz` and FASTA extensions removed.
    #[must_use]
    pub fn dataset_id(&self) -> String {
        let name = self.path.file_name().map_or_else(
            || self.path.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        );
        let name = name.strip_suffix(".gz").unwrap_or(&name);
        [".fasta", ".fa", ".faa"]
            .iter()
            .find_map(|ext| name.strip_suffix(ext))
            .unwrap_or(name)
            .to_string()
    }
}

/// Loads protein databases and modification definitions.
pub trait DatabaseLoader: Send + Sync {
    /// Loads the database described by `descriptor`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be read or is malformed.
    fn load_database(&self, descriptor: &DatabaseDescriptor) -> Result<Database>;

    /// Loads modification definitions.
    ///
    /// # Errors
    /// Returns an error if the definitions cannot be read or are malformed.
    fn load_modifications(&self, path: &Path) -> Result<Modifications> {
        Modifications::from_tsv(path)
    }
}

/// Loads FASTA databases, generating decoys according to [`DecoyHandling`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FastaLoader {
    decoy_handling: DecoyHandling,
}

impl FastaLoader {
    /// Creates a loader using the given decoy handling.
    #[must_use]
    pub fn new(decoy_handling: DecoyHandling) -> Self {
        Self { decoy_handling }
    }
}

impl DatabaseLoader for FastaLoader {
    fn load_database(&self, descriptor: &DatabaseDescriptor) -> Result<Database> {
        let reader = Io::default()
            .new_reader(&descriptor.path)
            .with_context(|| format!("Failed to open FASTA: {}", descriptor.path.display()))?;
        let mut targets = read_fasta(reader, &descriptor.path)?;
        if descriptor.is_contaminant {
            for protein in &mut targets {
                protein.is_contaminant = true;
            }
        }

        let decoys: Vec<Protein> =
            if descriptor.include_decoys && self.decoy_handling == DecoyHandling::Reverse {
                targets.iter().map(Protein::reversed_decoy).collect()
            } else {
                Vec::new()
            };
        let mut proteins = targets;
        proteins.extend(decoys);

        Ok(Database { id: descriptor.dataset_id(), proteins })
    }
}

/// Parses FASTA records. The accession is the first whitespace-delimited header token, or the
/// middle field of a UniProt-style `db|ACCESSION|NAME` token.
fn read_fasta(reader: Box<dyn BufRead + Send>, path: &Path) -> Result<Vec<Protein>> {
    let mut proteins: Vec<Protein> = Vec::new();
    for (line_number, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read FASTA: {}", path.display()))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(header) = line.strip_prefix('>') {
            let token = header.split_whitespace().next().unwrap_or_default();
            let accession = match token.split('|').collect::<Vec<_>>().as_slice() {
                [_, accession, ..] => (*accession).to_string(),
                _ => token.to_string(),
            };
            if accession.is_empty() {
                return Err(fasta_error(path, format!("empty header on line {}", line_number + 1)));
            }
            proteins.push(Protein::target(accession, String::new()));
        } else {
            let Some(protein) = proteins.last_mut() else {
                return Err(fasta_error(path, "sequence before first header".to_string()));
            };
            protein.sequence.extend(line.chars().map(|c| c.to_ascii_uppercase()));
        }
    }
    Ok(proteins)
}

fn fasta_error(path: &Path, reason: String) -> anyhow::Error {
    SweepError::InvalidFileFormat {
        file_type: "FASTA".to_string(),
        path: path.display().to_string(),
        reason,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    #[rstest]
    #[case("dbs/human.fasta", "human")]
    #[case("dbs/human.fasta.gz", "human")]
    #[case("variants.fa", "variants")]
    #[case("sample_1.faa", "sample_1")]
    #[case("plain", "plain")]
    fn test_dataset_id(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(DatabaseDescriptor::new(path, true).dataset_id(), expected);
    }

    #[test]
    fn test_reversed_decoy_keeps_initiator() {
        let protein = Protein::target("P1", "MABCK");
        let decoy = protein.reversed_decoy();
        assert_eq!(decoy.sequence, "MKCBA");
        assert_eq!(decoy.accession, "DECOY_P1");
        assert!(decoy.is_decoy);

        let no_met = Protein::target("P2", "ABC").reversed_decoy();
        assert_eq!(no_met.sequence, "CBA");
    }

    #[test]
    fn test_load_fasta_with_decoys() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("small.fasta");
        fs::write(&path, ">sp|P1|ONE_HUMAN first\nmpeptide\nKR\n>CON_P2\nAAAK\n")?;

        let loader = FastaLoader::new(DecoyHandling::Reverse);
        let db = loader.load_database(&DatabaseDescriptor::new(&path, true))?;
        assert_eq!(db.id, "small");
        assert_eq!(db.len(), 4);
        assert_eq!(db.target_count(), 2);
        assert_eq!(db.proteins[0].accession, "P1");
        assert_eq!(db.proteins[0].sequence, "MPEPTIDEKR");
        assert!(db.proteins[1].is_contaminant);
        assert!(db.accessions().contains("DECOY_P1"));

        let no_decoys = loader.load_database(&DatabaseDescriptor::new(&path, false))?;
        assert_eq!(no_decoys.len(), 2);

        let disabled = FastaLoader::new(DecoyHandling::None);
        assert_eq!(disabled.load_database(&DatabaseDescriptor::new(&path, true))?.len(), 2);
        Ok(())
    }

    #[test]
    fn test_contaminant_database_flags_all() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("contaminants.fasta");
        fs::write(&path, ">K1\nAAAK\n")?;
        let descriptor =
            DatabaseDescriptor { path, include_decoys: false, is_contaminant: true };
        let db = FastaLoader::default().load_database(&descriptor)?;
        assert!(db.proteins.iter().all(|p| p.is_contaminant));
        Ok(())
    }

    #[test]
    fn test_sequence_before_header_is_error() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("bad.fasta");
        fs::write(&path, "PEPTIDE\n>P1\nK\n")?;
        let err = FastaLoader::default()
            .load_database(&DatabaseDescriptor::new(&path, false))
            .expect_err("malformed FASTA should fail");
        assert!(err.to_string().contains("sequence before first header"));
        Ok(())
    }
}
