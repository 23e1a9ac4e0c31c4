//! Error types for the qhx-wavelet crate.

/// Error type for all fallible operations in the qhx-wavelet crate.
///
/// Covers input validation, scale-grid problems, and unknown wavelet
/// families requested by name.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WaveletError {
    /// Returned when the input series is shorter than the minimum required length.
    #[error("series too short: got {len} observations, need at least {min}")]
    SeriesTooShort {
        /// Number of observations provided.
        len: usize,
        /// Minimum number of observations required.
        min: usize,
    },

    /// Returned when the input data contains non-finite values (NaN or infinity).
    #[error("input data contains non-finite values")]
    NonFiniteData,

    /// Returned when the scale grid does not describe a usable frequency range:
    /// empty, non-positive, non-monotonic, or (for the adaptive transform)
    /// not ordered from low to high frequency.
    #[error("invalid frequency range: {0}")]
    InvalidFrequencyRange(String),

    /// Returned when a wavelet family name is not recognised.
    #[error("invalid wavelet type: {0}")]
    InvalidWaveletType(String),

    /// Returned when a transform parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_series_too_short() {
        let err = WaveletError::SeriesTooShort { len: 1, min: 2 };
        assert_eq!(
            err.to_string(),
            "series too short: got 1 observations, need at least 2"
        );
    }

    #[test]
    fn error_non_finite_data() {
        let err = WaveletError::NonFiniteData;
        assert_eq!(err.to_string(), "input data contains non-finite values");
    }

    #[test]
    fn error_invalid_frequency_range() {
        let err = WaveletError::InvalidFrequencyRange("scales must be descending".into());
        assert_eq!(
            err.to_string(),
            "invalid frequency range: scales must be descending"
        );
    }

    #[test]
    fn error_invalid_wavelet_type() {
        let err = WaveletError::InvalidWaveletType("paul".into());
        assert_eq!(err.to_string(), "invalid wavelet type: paul");
    }

    #[test]
    fn error_invalid_config() {
        let err = WaveletError::InvalidConfig("c_1 must be > 0".into());
        assert_eq!(err.to_string(), "invalid configuration: c_1 must be > 0");
    }

    #[test]
    fn error_is_std_error() {
        fn assert_impl<T: std::error::Error>() {}
        assert_impl::<WaveletError>();
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync>() {}
        assert_impl::<WaveletError>();
    }
}
