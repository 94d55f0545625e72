//! Synthetic FASTA and spectra inputs.
//!
//! Every protein is a single tryptic peptide with a unique amino acid composition, so each scan
//! written here matches exactly one target peptide and no decoy.

use fgsweep_lib::database::DatabaseDescriptor;
use fgsweep_lib::digest::{WATER_MASS, residue_mass};
use fgsweep_lib::scheduler::RunInputs;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Baseline proteins as (accession, sequence).
pub const BASELINE: &[(&str, &str)] =
    &[("B1", "PEPTIDEK"), ("B2", "LLLLLLLK"), ("B3", "WWWWWWWK")];

/// One protein per transient database, indexed by dataset.
pub const TRANSIENTS: &[(&str, &str)] = &[
    ("T0", "AAAAAAAK"),
    ("T1", "SSSSSSSK"),
    ("T2", "TTTTTTTK"),
    ("T3", "VVVVVVVK"),
    ("T4", "NNNNNNNK"),
];

/// Precursor masses that match nothing.
const UNMATCHED: &[f64] = &[2000.0, 2100.0, 2200.0, 2300.0];

/// Neutral monoisotopic mass of an unmodified peptide.
pub fn peptide_mass(sequence: &str) -> f64 {
    sequence.chars().filter_map(residue_mass).sum::<f64>() + WATER_MASS
}

/// Writes a FASTA file with the given proteins.
pub fn write_fasta(path: &Path, proteins: &[(&str, &str)]) {
    let mut text = String::new();
    for (accession, sequence) in proteins {
        writeln!(text, ">{accession} synthetic").unwrap();
        writeln!(text, "{sequence}").unwrap();
    }
    fs::write(path, text).unwrap();
}

/// Writes a spectra table with one scan per mass.
pub fn write_spectra(path: &Path, masses: &[f64]) {
    let mut text = String::from("scan\tprecursor_mass\tcharge\tretention_time\n");
    for (i, mass) in masses.iter().enumerate() {
        writeln!(text, "{}\t{mass}\t2\t{}.5", i + 1, i + 1).unwrap();
    }
    fs::write(path, text).unwrap();
}

/// Writes `n` transient databases and one spectra source of 10 scans: one per baseline protein,
/// one per transient protein (for the first three datasets), and the rest unmatched.
///
/// Dataset identifiers are `sample0`, `sample1`, ...
pub fn write_run_inputs(dir: &Path, n: usize) -> RunInputs {
    assert!(n <= TRANSIENTS.len());
    let baseline = dir.join("baseline.fasta");
    write_fasta(&baseline, BASELINE);

    let transients: Vec<DatabaseDescriptor> = TRANSIENTS
        .iter()
        .take(n)
        .enumerate()
        .map(|(i, protein)| {
            let path = dir.join(format!("sample{i}.fasta"));
            write_fasta(&path, &[*protein]);
            DatabaseDescriptor::new(path, true)
        })
        .collect();

    let mut masses: Vec<f64> = BASELINE.iter().map(|(_, s)| peptide_mass(s)).collect();
    masses.extend(TRANSIENTS.iter().take(3).map(|(_, s)| peptide_mass(s)));
    masses.extend_from_slice(UNMATCHED);
    masses.truncate(10);
    let spectra = dir.join("run1.tsv");
    write_spectra(&spectra, &masses);

    RunInputs {
        baseline: DatabaseDescriptor::new(baseline, true),
        modifications: None,
        transients,
        spectra: vec![spectra],
        output_dir: dir.join("out"),
    }
}

/// Number of data rows in a TSV file with a header.
pub fn data_rows(path: &Path) -> usize {
    fs::read_to_string(path).unwrap().lines().count().saturating_sub(1)
}
