//! Spectra sources.
//!
//! The built-in [`TsvSpectraLoader`] reads precursor-level scan tables with the columns `scan`,
//! `precursor_mass` (neutral monoisotopic mass), `charge`, and `retention_time`. The same scan
//! number may appear more than once when a spectrum has several precursor candidates.

use anyhow::{Context, Result};
use fgoxide::io::DelimFile;
use serde::Deserialize;
use std::path::Path;

/// A single precursor observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Scan {
    /// Source file stem the scan was read from
    pub file_name: String,
    /// Scan number within the source file
    pub scan_number: u32,
    /// Neutral monoisotopic precursor mass
    pub precursor_mass: f64,
    /// Precursor charge
    pub charge: u8,
    /// Retention time in minutes
    pub retention_time: f64,
}

/// Loads the scans of one spectra source.
pub trait SpectraLoader: Send + Sync {
    /// Reads every scan of the source at `path`.
    ///
    /// # Errors
    /// Returns an error if the source cannot be read or is malformed.
    fn load(&self, path: &Path) -> Result<Vec<Scan>>;
}

#[derive(Debug, Deserialize)]
struct ScanRow {
    scan: u32,
    precursor_mass: f64,
    charge: u8,
    retention_time: f64,
}

/// Reads scans from tab-separated tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct TsvSpectraLoader;

impl SpectraLoader for TsvSpectraLoader {
    fn load(&self, path: &Path) -> Result<Vec<Scan>> {
        let rows: Vec<ScanRow> = DelimFile::default()
            .read_tsv(path)
            .with_context(|| format!("Failed to read spectra: {}", path.display()))?;
        let file_name = source_name(path);
        Ok(rows
            .into_iter()
            .map(|row| Scan {
                file_name: file_name.clone(),
                scan_number: row.scan,
                precursor_mass: row.precursor_mass,
                charge: row.charge,
                retention_time: row.retention_time,
            })
            .collect())
    }
}

/// File stem used to label scans from `path`.
#[must_use]
pub fn source_name(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned())
}
