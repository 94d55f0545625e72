//! Input validation utilities
//!
//! This module provides common validation functions for command-line parameters and input
//! paths with consistent error messages, using the structured error types from [`crate::errors`].

use crate::errors::{Result, SweepError};
use std::fmt::Display;
use std::path::Path;

/// Validate that a file exists
///
/// # Arguments
/// * `path` - Path to validate
/// * `description` - Human-readable description of the file (e.g., "Transient database")
///
/// # Errors
/// Returns an error if the file does not exist
///
/// # Example
/// ```
/// use fgsweep_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/proteins.fasta", "Baseline database");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.is_file() {
        return Err(SweepError::InvalidFileFormat {
            file_type: description.to_string(),
            path: path_ref.display().to_string(),
            reason: "File does not exist".to_string(),
        });
    }
    Ok(())
}

/// Validate that multiple files exist
///
/// # Errors
/// Returns an error for the first file that doesn't exist
pub fn validate_files_exist<P: AsRef<Path>>(files: &[(P, &str)]) -> Result<()> {
    for (path, desc) in files {
        validate_file_exists(path, desc)?;
    }
    Ok(())
}

/// Validate that a list of inputs is not empty
///
/// # Errors
/// Returns an error if `values` is empty
pub fn validate_not_empty<T>(values: &[T], name: &str) -> Result<()> {
    if values.is_empty() {
        return Err(SweepError::invalid_parameter(name, "At least one value is required"));
    }
    Ok(())
}

/// Validate that a value is positive (> 0)
///
/// # Errors
/// Returns an error if the value is not positive
///
/// # Example
/// ```
/// use fgsweep_lib::validation::validate_positive;
///
/// validate_positive(2, "max-concurrent-jobs").unwrap();
///
/// let result = validate_positive(0, "max-concurrent-jobs");
/// assert!(result.is_err());
/// ```
#[allow(clippy::needless_pass_by_value)]
pub fn validate_positive<T: Ord + Display + Default>(value: T, name: &str) -> Result<()> {
    if value <= T::default() {
        return Err(SweepError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("Must be positive (> 0), got: {value}"),
        });
    }
    Ok(())
}
