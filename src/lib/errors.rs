//! Custom error types for fgsweep operations.

use thiserror::Error;

/// Result type alias for fgsweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Error type for fgsweep operations
#[derive(Error, Debug)]
pub enum SweepError {
    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// File format error
    #[error("Invalid {file_type} file '{path}': {reason}")]
    InvalidFileFormat {
        /// Type of file (e.g., "FASTA", "spectra")
        file_type: String,
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// Two transient databases resolve to the same dataset identifier
    #[error("Duplicate transient dataset identifier '{dataset_id}'")]
    DuplicateDataset {
        /// The identifier shared by more than one input
        dataset_id: String,
    },

    /// The run was cancelled before the operation finished
    #[error("Operation cancelled")]
    Cancelled,
}

impl SweepError {
    /// Shorthand for an [`SweepError::InvalidParameter`].
    #[must_use]
    pub fn invalid_parameter(parameter: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter { parameter: parameter.to_string(), reason: reason.into() }
    }
}

/// Extract a human-readable message from a panic payload.
///
/// Handles the common `&str` and `String` payloads, with a fallback for other types.
#[must_use]
pub fn extract_panic_message(panic_info: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
