//! Validated, uniformly sampled signal.

use crate::error::WaveletError;

/// A uniformly sampled signal of finite `f64` values.
///
/// Guarantees:
/// - length >= 2
/// - all values are finite (no NaN or infinity)
/// - the sampling rate is finite and positive
///
/// # Example
///
/// ```ignore
/// use qhx_wavelet::TimeSeries;
///
/// let ts = TimeSeries::new(vec![1.0, 2.0, 3.0], 1000.0)?;
/// assert_eq!(ts.dt(), 0.001);
/// ```
#[derive(Clone, Debug)]
pub struct TimeSeries {
    data: Vec<f64>,
    samplerate: f64,
}

impl TimeSeries {
    /// Creates a new `TimeSeries` after validating the data.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`WaveletError::SeriesTooShort`] | `data.len() < 2` |
    /// | [`WaveletError::NonFiniteData`] | any element is NaN or infinite |
    /// | [`WaveletError::InvalidConfig`] | `samplerate` is not finite and positive |
    pub fn new(data: Vec<f64>, samplerate: f64) -> Result<Self, WaveletError> {
        if data.len() < 2 {
            return Err(WaveletError::SeriesTooShort {
                len: data.len(),
                min: 2,
            });
        }
        if !data.iter().all(|v| v.is_finite()) {
            return Err(WaveletError::NonFiniteData);
        }
        if !(samplerate.is_finite() && samplerate > 0.0) {
            return Err(WaveletError::InvalidConfig(format!(
                "samplerate must be finite and > 0, got {samplerate}"
            )));
        }
        Ok(Self { data, samplerate })
    }

    /// Returns the samples as a slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Returns the sampling rate in samples per time unit.
    pub fn samplerate(&self) -> f64 {
        self.samplerate
    }

    /// Returns the sampling interval `1 / samplerate`.
    pub fn dt(&self) -> f64 {
        1.0 / self.samplerate
    }

    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the series is empty.
    ///
    /// Note: a valid `TimeSeries` is never empty (minimum length is 2).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[f64]> for TimeSeries {
    fn as_ref(&self) -> &[f64] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_valid_series() {
        let ts = TimeSeries::new(vec![1.0, 2.0, 3.0], 4.0).unwrap();
        assert_eq!(ts.len(), 3);
        assert!(!ts.is_empty());
        assert_eq!(ts.as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(ts.dt(), 0.25);
    }

    #[test]
    fn new_too_short_one() {
        let err = TimeSeries::new(vec![1.0], 1.0).unwrap_err();
        assert!(matches!(
            err,
            WaveletError::SeriesTooShort { len: 1, min: 2 }
        ));
    }

    #[test]
    fn new_nan_rejected() {
        let err = TimeSeries::new(vec![1.0, f64::NAN, 3.0], 1.0).unwrap_err();
        assert!(matches!(err, WaveletError::NonFiniteData));
    }

    #[test]
    fn new_bad_samplerate_rejected() {
        for rate in [0.0, -1.0, f64::INFINITY] {
            let err = TimeSeries::new(vec![1.0, 2.0], rate).unwrap_err();
            assert!(matches!(err, WaveletError::InvalidConfig(_)));
        }
    }

    #[test]
    fn series_is_send_and_sync() {
        fn assert_impl<T: Send + Sync>() {}
        assert_impl::<TimeSeries>();
    }
}
