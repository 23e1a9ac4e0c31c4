//! Error types for the qhx-hybrid crate.

use qhx_wwz::WwzError;

/// Error type for correlation, peak extraction, significance and matching.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HybridError {
    /// Propagated from the WWZ transform or its grid.
    #[error(transparent)]
    Wwz(#[from] WwzError),

    /// Returned when two matrices cannot be correlated.
    #[error("shape mismatch: {left_cols} columns vs {right_cols} columns")]
    ShapeMismatch {
        /// Columns of the left operand.
        left_cols: usize,
        /// Columns of the right operand.
        right_cols: usize,
    },

    /// Returned when a correlation profile does not match the frequency grid.
    #[error("profile has {len} rows but the grid has {expected} frequencies")]
    GridMismatch {
        /// Rows found.
        len: usize,
        /// Grid frequencies expected.
        expected: usize,
    },

    /// Returned when a peak is requested that does not exist.
    #[error("peak {index} out of range for {len} peaks")]
    InvalidPeakIndex {
        /// Requested peak.
        index: usize,
        /// Number of peaks available.
        len: usize,
    },

    /// Returned when error-perturbed shuffles are requested without errors.
    #[error("magnitude errors are required when use_mag_errors is set")]
    MissingMagnitudeErrors,

    /// Returned when magnitude errors and magnitudes differ in length.
    #[error("{errors} magnitude errors for {magnitudes} magnitudes")]
    ErrorLengthMismatch {
        /// Number of magnitudes.
        magnitudes: usize,
        /// Number of magnitude errors.
        errors: usize,
    },

    /// Returned when a parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
