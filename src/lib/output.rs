//! Per-job output tables and summaries.
//!
//! Every writer reads a frozen [`JobResults`] and never changes it, so writers for the same job
//! can run in any order or at the same time.

use anyhow::{Context, Result};
use fgoxide::io::DelimFile;
use fgsweep_metrics::{TransientSearchMetrics, format_count};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::OutputFilter;
use crate::logging::{format_percent, fraction};
use crate::pipeline::JobResults;
use crate::psm::Psm;

/// All matches.
pub const PSMS_FILE: &str = "psms.tsv";
/// Matches involving the transient database.
pub const TRANSIENT_PSMS_FILE: &str = "psms.transient.tsv";
/// All peptides.
pub const PEPTIDES_FILE: &str = "peptides.tsv";
/// Peptides involving the transient database.
pub const TRANSIENT_PEPTIDES_FILE: &str = "peptides.transient.tsv";
/// Protein groups.
pub const PROTEIN_GROUPS_FILE: &str = "protein_groups.tsv";
/// Best transient match per (sequence, charge).
pub const LIBRARY_FILE: &str = "library.tsv";
/// Human-readable per-job summary.
pub const JOB_SUMMARY_FILE: &str = "summary.txt";

#[derive(Debug, Serialize)]
struct PsmRow<'a> {
    file_name: &'a str,
    scan_number: u32,
    precursor_mass: f64,
    charge: u8,
    retention_time: f64,
    score: f64,
    sequence: String,
    accessions: String,
    notch: usize,
    decoy: bool,
    contaminant: bool,
    ambiguous: bool,
    transient: bool,
    q_value: Option<f64>,
    q_value_notch: Option<f64>,
}

impl<'a> PsmRow<'a> {
    fn new(psm: &'a Psm, transient: bool) -> Self {
        Self {
            file_name: &psm.file_name,
            scan_number: psm.scan_number,
            precursor_mass: psm.precursor_mass,
            charge: psm.charge,
            retention_time: psm.retention_time,
            score: psm.score,
            sequence: psm.display_sequence(),
            accessions: psm.accessions(),
            notch: psm.notch(),
            decoy: psm.is_decoy(),
            contaminant: psm.is_contaminant(),
            ambiguous: psm.is_ambiguous(),
            transient,
            q_value: psm.q_value,
            q_value_notch: psm.q_value_notch,
        }
    }
}

#[derive(Debug, Serialize)]
struct PeptideRow<'a> {
    sequence: String,
    accessions: String,
    psm_count: usize,
    best_score: f64,
    best_file_name: &'a str,
    best_scan_number: u32,
    decoy: bool,
    contaminant: bool,
    transient: bool,
    q_value: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ProteinGroupRow {
    accessions: String,
    peptide_count: usize,
    peptides: String,
    score: f64,
    decoy: bool,
    contaminant: bool,
    transient: bool,
    q_value: Option<f64>,
}

#[derive(Debug, Serialize)]
struct LibraryRow<'a> {
    sequence: &'a str,
    charge: u8,
    precursor_mass: f64,
    retention_time: f64,
    score: f64,
    q_value: Option<f64>,
    file_name: &'a str,
    scan_number: u32,
    accessions: String,
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T], description: &str) -> Result<()> {
    DelimFile::default()
        .write_tsv(path, rows)
        .with_context(|| format!("Failed to write {description}: {}", path.display()))
}

/// Writes the match table. With `transient_only`, only matches involving the transient database
/// are written.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_psms(
    path: &Path,
    results: &JobResults,
    filter: &OutputFilter,
    transient_only: bool,
) -> Result<()> {
    let rows: Vec<PsmRow> = results
        .matches
        .iter()
        .filter(|m| (!transient_only || m.transient) && filter.keeps_psm(&m.psm))
        .map(|m| PsmRow::new(&m.psm, m.transient))
        .collect();
    write_rows(path, &rows, "PSMs")
}

/// Writes the peptide table, one row per resolved sequence.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_peptides(
    path: &Path,
    results: &JobResults,
    filter: &OutputFilter,
    transient_only: bool,
) -> Result<()> {
    let rows: Vec<PeptideRow> = results
        .peptides
        .iter()
        .filter(|p| (!transient_only || p.transient) && filter.keeps_psm(&p.best))
        .map(|p| PeptideRow {
            sequence: p.best.display_sequence(),
            accessions: p.best.accessions(),
            psm_count: p.psm_count,
            best_score: p.best.score,
            best_file_name: &p.best.file_name,
            best_scan_number: p.best.scan_number,
            decoy: p.best.is_decoy(),
            contaminant: p.best.is_contaminant(),
            transient: p.transient,
            q_value: p.best.q_value,
        })
        .collect();
    write_rows(path, &rows, "peptides")
}

/// Writes the protein group table. Writes nothing if grouping was not run.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_protein_groups(
    path: &Path,
    results: &JobResults,
    filter: &OutputFilter,
) -> Result<()> {
    let Some(groups) = &results.groups else { return Ok(()) };
    let rows: Vec<ProteinGroupRow> = groups
        .iter()
        .filter(|g| filter.keeps_group(&g.group))
        .map(|g| ProteinGroupRow {
            accessions: g.group.accessions.join("|"),
            peptide_count: g.group.peptides.len(),
            peptides: g.group.peptides.join("|"),
            score: g.group.score,
            decoy: g.group.is_decoy,
            contaminant: g.group.is_contaminant,
            transient: g.transient,
            q_value: g.group.q_value,
        })
        .collect();
    write_rows(path, &rows, "protein groups")
}

/// Writes the best confident, resolved, target match involving the transient database for each
/// (sequence, charge) pair.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_library(path: &Path, results: &JobResults, q_value_threshold: f64) -> Result<()> {
    let mut best: BTreeMap<(&str, u8), &Psm> = BTreeMap::new();
    for record in results.matches.iter().filter(|m| m.transient) {
        let psm = &record.psm;
        let Some(sequence) = psm.resolved_sequence.as_deref() else { continue };
        if psm.is_decoy() || !psm.passes(q_value_threshold) {
            continue;
        }
        best.entry((sequence, psm.charge))
            .and_modify(|current| {
                if psm.rank_cmp(current).is_lt() {
                    *current = psm;
                }
            })
            .or_insert(psm);
    }

    let rows: Vec<LibraryRow> = best
        .into_iter()
        .map(|((sequence, charge), psm)| LibraryRow {
            sequence,
            charge,
            precursor_mass: psm.precursor_mass,
            retention_time: psm.retention_time,
            score: psm.score,
            q_value: psm.q_value,
            file_name: &psm.file_name,
            scan_number: psm.scan_number,
            accessions: psm.accessions(),
        })
        .collect();
    write_rows(path, &rows, "spectral library")
}

/// Writes the human-readable summary of one job.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_job_summary(
    path: &Path,
    metrics: &TransientSearchMetrics,
    q_value_threshold: f64,
) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "Transient database: {}", metrics.dataset_id)?;
    write_counts(&mut writer, metrics, q_value_threshold)?;
    writer.flush().with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Writes the counter block shared by the per-job summary and the run report.
pub(crate) fn write_counts(
    writer: &mut impl Write,
    metrics: &TransientSearchMetrics,
    q_value_threshold: f64,
) -> std::io::Result<()> {
    let m = metrics;
    writeln!(writer, "Transient proteins: {}", format_count(m.transient_proteins))?;
    writeln!(
        writer,
        "PSMs: {} ({} target, {} decoy)",
        format_count(m.total_psms),
        format_count(m.target_psms),
        format_count(m.decoy_psms)
    )?;
    writeln!(
        writer,
        "Target PSMs at q <= {q_value_threshold}: {} ({})",
        format_count(m.confident_target_psms),
        format_percent(fraction(m.confident_target_psms, m.target_psms), 2)
    )?;
    writeln!(
        writer,
        "Decoy PSMs at q <= {q_value_threshold}: {}",
        format_count(m.confident_decoy_psms)
    )?;
    writeln!(
        writer,
        "Transient PSMs: {} ({} target, {} decoy)",
        format_count(m.transient_psms),
        format_count(m.transient_target_psms),
        format_count(m.transient_decoy_psms)
    )?;
    writeln!(
        writer,
        "Transient target PSMs at q <= {q_value_threshold}: {}",
        format_count(m.confident_transient_target_psms)
    )?;
    writeln!(
        writer,
        "Transient decoy PSMs at q <= {q_value_threshold}: {}",
        format_count(m.confident_transient_decoy_psms)
    )?;
    writeln!(writer, "Peptides: {}", format_count(m.total_peptides))?;
    writeln!(
        writer,
        "Target peptides at q <= {q_value_threshold}: {}",
        format_count(m.confident_target_peptides)
    )?;
    writeln!(writer, "Transient peptides: {}", format_count(m.transient_peptides))?;
    writeln!(
        writer,
        "Transient target peptides at q <= {q_value_threshold}: {}",
        format_count(m.confident_transient_target_peptides)
    )?;
    writeln!(writer, "Protein groups: {}", format_count(m.protein_groups))?;
    writeln!(
        writer,
        "Target protein groups at q <= {q_value_threshold}: {}",
        format_count(m.confident_target_protein_groups)
    )?;
    writeln!(writer, "Transient protein groups: {}", format_count(m.transient_protein_groups))?;
    writeln!(
        writer,
        "Transient target protein groups at q <= {q_value_threshold}: {}",
        format_count(m.confident_transient_target_protein_groups)
    )?;
    Ok(())
}
