//! Tryptic digestion and the mass-sorted peptide index.
//!
//! Proteins are cleaved after K or R unless the next residue is P. Each peptide carries the
//! accession and flags of the protein it came from, so a sequence shared by several proteins
//! appears once per protein; the search reports those as tied candidates.

use ahash::AHashSet;
use std::fmt::Write as _;

use crate::database::Database;
use crate::modification::Modifications;

/// Monoisotopic mass of water.
pub const WATER_MASS: f64 = 18.010_564_684;

/// Monoisotopic residue mass, or `None` for residues that cannot be searched.
#[must_use]
pub fn residue_mass(residue: char) -> Option<f64> {
    let mass = match residue {
        'G' => 57.021_463_72,
        'A' => 71.037_113_79,
        'S' => 87.032_028_41,
        'P' => 97.052_763_85,
        'V' => 99.068_413_91,
        'T' => 101.047_678_5,
        'C' => 103.009_184_5,
        'L' | 'I' => 113.084_064,
        'N' => 114.042_927_4,
        'D' => 115.026_943,
        'Q' => 128.058_577_5,
        'K' => 128.094_963,
        'E' => 129.042_593_1,
        'M' => 131.040_484_6,
        'H' => 137.058_911_9,
        'F' => 147.068_413_9,
        'U' => 150.953_633_4,
        'R' => 156.101_111,
        'Y' => 163.063_328_6,
        'W' => 186.079_312_9,
        _ => return None,
    };
    Some(mass)
}

/// Digestion settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestionParams {
    /// Minimum peptide length in residues
    pub min_length: usize,
    /// Maximum peptide length in residues
    pub max_length: usize,
    /// Maximum number of internal cleavage sites a peptide may span
    pub max_missed_cleavages: usize,
}

impl Default for DigestionParams {
    fn default() -> Self {
        Self { min_length: 7, max_length: 50, max_missed_cleavages: 2 }
    }
}

/// A digested peptide with its source protein.
#[derive(Debug, Clone, PartialEq)]
pub struct Peptide {
    /// Sequence annotated with variable modifications, e.g. `PEPM[Oxidation]K`
    pub full_sequence: String,
    /// Unmodified sequence
    pub base_sequence: String,
    /// Accession of the source protein
    pub accession: String,
    /// Monoisotopic neutral mass including fixed and variable modifications
    pub monoisotopic_mass: f64,
    /// True if the source protein is a decoy
    pub is_decoy: bool,
    /// True if the source protein is a contaminant
    pub is_contaminant: bool,
}

/// Peptides sorted ascending by monoisotopic mass.
#[derive(Debug, Clone, Default)]
pub struct PeptideIndex {
    peptides: Vec<Peptide>,
}

impl PeptideIndex {
    /// Digests every protein in `database` and sorts the result by mass.
    #[must_use]
    pub fn build(database: &Database, mods: &Modifications, params: &DigestionParams) -> Self {
        let mut peptides = Vec::new();
        for protein in &database.proteins {
            let mut seen: AHashSet<String> = AHashSet::new();
            for base in cleave(&protein.sequence, params) {
                for (full_sequence, mass) in modified_forms(base, mods) {
                    if seen.insert(full_sequence.clone()) {
                        peptides.push(Peptide {
                            full_sequence,
                            base_sequence: base.to_string(),
                            accession: protein.accession.clone(),
                            monoisotopic_mass: mass,
                            is_decoy: protein.is_decoy,
                            is_contaminant: protein.is_contaminant,
                        });
                    }
                }
            }
        }
        Self::from_peptides(peptides)
    }

    /// Builds an index from already-digested peptides.
    #[must_use]
    pub fn from_peptides(mut peptides: Vec<Peptide>) -> Self {
        peptides.sort_by(|a, b| {
            a.monoisotopic_mass
                .total_cmp(&b.monoisotopic_mass)
                .then_with(|| a.full_sequence.cmp(&b.full_sequence))
                .then_with(|| a.accession.cmp(&b.accession))
        });
        Self { peptides }
    }

    /// Peptides whose mass lies within `[low, high]`.
    #[must_use]
    pub fn in_range(&self, low: f64, high: f64) -> &[Peptide] {
        let start = self.peptides.partition_point(|p| p.monoisotopic_mass < low);
        let end = self.peptides.partition_point(|p| p.monoisotopic_mass <= high);
        &self.peptides[start..end.max(start)]
    }

    /// All peptides in mass order.
    #[must_use]
    pub fn peptides(&self) -> &[Peptide] {
        &self.peptides
    }

    /// Number of peptides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peptides.len()
    }

    /// True if the index holds no peptides.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peptides.is_empty()
    }
}

/// Tryptic cleavage products of `sequence` within the length bounds.
fn cleave<'a>(sequence: &'a str, params: &DigestionParams) -> Vec<&'a str> {
    let bytes = sequence.as_bytes();
    let mut sites = vec![0];
    for i in 0..bytes.len() {
        let cleaves = matches!(bytes[i], b'K' | b'R') && bytes.get(i + 1) != Some(&b'P');
        if cleaves && i + 1 < bytes.len() {
            sites.push(i + 1);
        }
    }
    sites.push(bytes.len());
    sites.dedup();

    let mut peptides = Vec::new();
    for start in 0..sites.len() - 1 {
        for missed in 0..=params.max_missed_cleavages {
            let Some(&end) = sites.get(start + 1 + missed) else { break };
            let length = end - sites[start];
            if (params.min_length..=params.max_length).contains(&length) {
                peptides.push(&sequence[sites[start]..end]);
            }
        }
    }
    peptides
}

/// The fixed-modified form of `base` plus one form per variable modification site.
///
/// Returns an empty list when `base` contains a residue without a known mass.
fn modified_forms(base: &str, mods: &Modifications) -> Vec<(String, f64)> {
    let mut mass = WATER_MASS;
    for residue in base.chars() {
        match residue_mass(residue) {
            Some(m) => mass += m + mods.fixed_shift(residue),
            None => return Vec::new(),
        }
    }

    let mut forms = vec![(base.to_string(), mass)];
    for (position, residue) in base.char_indices() {
        for modification in mods.variable.iter().filter(|m| m.residue == residue) {
            let mut full = String::with_capacity(base.len() + modification.id.len() + 2);
            full.push_str(&base[..=position]);
            let _ = write!(full, "[{}]", modification.id);
            full.push_str(&base[position + 1..]);
            forms.push((full, mass + modification.mass_shift));
        }
    }
    forms
}
