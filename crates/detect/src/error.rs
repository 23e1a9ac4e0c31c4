//! Error types for the qhx-detect crate.

use qhx_hybrid::HybridError;
use qhx_wwz::WwzError;

use crate::band::BandId;

/// Error type for light-curve handling, per-object detection and batch runs.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DetectError {
    /// Propagated from the WWZ grid or transform.
    #[error(transparent)]
    Wwz(#[from] WwzError),

    /// Propagated from correlation, peak extraction or matching.
    #[error(transparent)]
    Hybrid(#[from] HybridError),

    /// Returned when a band has too few usable observations.
    #[error("insufficient data for object {set_id}, band {band}: {len} points, need {min}")]
    InsufficientData {
        /// Band that failed.
        band: BandId,
        /// Object identifier.
        set_id: String,
        /// Points available after cleaning.
        len: usize,
        /// Minimum required.
        min: usize,
    },

    /// Returned when a source has no light curves for an object.
    #[error("object {set_id} not found")]
    ObjectNotFound {
        /// Object identifier.
        set_id: String,
    },

    /// Returned when light-curve columns differ in length.
    #[error("length mismatch: {time} times, {magnitude} magnitudes, {errors} errors")]
    LengthMismatch {
        /// Number of times.
        time: usize,
        /// Number of magnitudes.
        magnitude: usize,
        /// Number of magnitude errors (0 when absent).
        errors: usize,
    },

    /// Returned when a detection step runs out of order.
    #[error("cannot {step} in state {state}")]
    InvalidState {
        /// Step that was attempted.
        step: &'static str,
        /// State the detector was in.
        state: String,
    },

    /// Returned when a parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
