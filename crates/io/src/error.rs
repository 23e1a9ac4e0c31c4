//! Error types for qhx-io.

use std::path::PathBuf;

use qhx_detect::DetectError;

/// Error type for all fallible operations in the qhx-io crate.
///
/// Covers file-system failures, Arrow and Parquet errors, schema and
/// configuration problems, and light-curve errors raised while building
/// objects from a table.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when a required file does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path that could not be found.
        path: PathBuf,
    },

    /// Wraps a file-system failure.
    #[error("i/o error on {}: {reason}", path.display())]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// Wraps an error originating from the Parquet library.
    #[error("parquet error: {reason}")]
    Parquet {
        /// Description of the underlying Parquet failure.
        reason: String,
    },

    /// Wraps an error originating from the Arrow library.
    #[error("arrow error: {reason}")]
    Arrow {
        /// Description of the underlying Arrow failure.
        reason: String,
    },

    /// Returned when one or more validation checks fail.
    #[error("{count} validation error(s): {details}")]
    Validation {
        /// Number of accumulated validation failures.
        count: usize,
        /// Human-readable summary of the failures.
        details: String,
    },

    /// Returned when a required column is not present in a file.
    #[error("column '{name}' not found in {}", path.display())]
    MissingColumn {
        /// Name of the missing column.
        name: String,
        /// Path to the file that was inspected.
        path: PathBuf,
    },

    /// Propagated from light-curve construction.
    #[error(transparent)]
    Detect(#[from] DetectError),
}

impl From<parquet::errors::ParquetError> for IoError {
    fn from(e: parquet::errors::ParquetError) -> Self {
        IoError::Parquet {
            reason: e.to_string(),
        }
    }
}

impl From<arrow::error::ArrowError> for IoError {
    fn from(e: arrow::error::ArrowError) -> Self {
        IoError::Arrow {
            reason: e.to_string(),
        }
    }
}
