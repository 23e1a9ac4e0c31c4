//! Error types for the qhx-wwz crate.

/// Error type for the weighted wavelet Z-transform.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WwzError {
    /// Returned when the period bounds are missing or unusable.
    #[error("invalid frequency bounds: {reason}")]
    InvalidFrequencyBounds {
        /// What is wrong with the bounds.
        reason: String,
    },

    /// Returned when the grid resolution or time-division count is zero.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// Returned when time and magnitude arrays differ in length.
    #[error("length mismatch: {time} timestamps but {magnitude} magnitudes")]
    LengthMismatch {
        /// Number of timestamps.
        time: usize,
        /// Number of magnitudes.
        magnitude: usize,
    },

    /// Returned when the series is too short to fit three basis functions.
    #[error("series too short: got {len} observations, need at least {min}")]
    SeriesTooShort {
        /// Number of observations provided.
        len: usize,
        /// Minimum number of observations required.
        min: usize,
    },

    /// Returned when the input contains NaN or infinite values.
    #[error("input data contains non-finite values")]
    NonFiniteData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_invalid_frequency_bounds() {
        let err = WwzError::InvalidFrequencyBounds {
            reason: "min_period is not set".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid frequency bounds: min_period is not set"
        );
    }

    #[test]
    fn error_invalid_grid() {
        let err = WwzError::InvalidGrid("ngrid must be > 0".into());
        assert_eq!(err.to_string(), "invalid grid: ngrid must be > 0");
    }

    #[test]
    fn error_length_mismatch() {
        let err = WwzError::LengthMismatch {
            time: 10,
            magnitude: 9,
        };
        assert_eq!(
            err.to_string(),
            "length mismatch: 10 timestamps but 9 magnitudes"
        );
    }

    #[test]
    fn error_series_too_short() {
        let err = WwzError::SeriesTooShort { len: 2, min: 4 };
        assert_eq!(
            err.to_string(),
            "series too short: got 2 observations, need at least 4"
        );
    }

    #[test]
    fn error_is_std_error() {
        fn assert_impl<T: std::error::Error>() {}
        assert_impl::<WwzError>();
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync>() {}
        assert_impl::<WwzError>();
    }
}
