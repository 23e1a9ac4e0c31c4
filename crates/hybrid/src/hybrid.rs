//! The hybrid step: WWZ power surface to a frequency-by-frequency covariance.

use qhx_wwz::{WwzConfig, WwzResult, wwz};
use tracing::debug;

use crate::correlation::correlation_nd;
use crate::error::HybridError;

/// WWZ transform of one light curve with its frequency auto-covariance.
#[derive(Clone, Debug)]
pub struct Hybrid2d {
    wwz: WwzResult,
    correlation: Vec<Vec<f64>>,
    extent: [f64; 4],
}

impl Hybrid2d {
    /// Returns the underlying transform.
    pub fn wwz(&self) -> &WwzResult {
        &self.wwz
    }

    /// Returns the `[n_freq][n_freq]` covariance, rows and columns in
    /// ascending frequency.
    pub fn correlation(&self) -> &[Vec<f64>] {
        &self.correlation
    }

    /// Returns `[f_min, f_max, f_min, f_max]` for plotting.
    pub fn extent(&self) -> [f64; 4] {
        self.extent
    }

    /// Consumes the result, returning the covariance matrix.
    pub fn into_correlation(self) -> Vec<Vec<f64>> {
        self.correlation
    }
}

/// Runs the WWZ transform and correlates its power plane across frequency.
///
/// Each frequency row of the Z statistic is a variable observed at every
/// window centre, so the result measures how power at one frequency moves
/// with power at another over time.
///
/// # Errors
///
/// Propagates [`HybridError::Wwz`] from the transform.
pub fn hybrid2d(
    time: &[f64],
    magnitude: &[f64],
    config: &WwzConfig,
) -> Result<Hybrid2d, HybridError> {
    let result = wwz(time, magnitude, config)?;
    let correlation = correlation_nd(result.power(), result.power())?;

    let freq = result.freq();
    let lo = freq.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = freq.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    debug!(n_freq = freq.len(), n_tau = result.n_tau(), "hybrid correlation done");

    Ok(Hybrid2d {
        wwz: result,
        correlation,
        extent: [lo, hi, lo, hi],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn shapes_and_extent() {
        let t: Vec<f64> = (0..200).map(|i| i as f64 * 2.5).collect();
        let y: Vec<f64> = t.iter().map(|&ti| (2.0 * PI * ti / 60.0).sin()).collect();
        let config = WwzConfig::new(15, 30).with_period_bounds(200.0, 20.0);
        let h = hybrid2d(&t, &y, &config).unwrap();
        assert_eq!(h.correlation().len(), 31);
        assert!(h.correlation().iter().all(|row| row.len() == 31));
        let [a, b, c, d] = h.extent();
        assert!((a - 1.0 / 200.0).abs() < 1e-12);
        assert!((b - 1.0 / 20.0).abs() < 1e-12);
        assert_eq!((a, b), (c, d));
        assert_eq!(h.wwz().n_tau(), 15);
    }

    #[test]
    fn missing_bounds_propagate() {
        let t: Vec<f64> = (0..10).map(f64::from).collect();
        let err = hybrid2d(&t, &t, &WwzConfig::new(5, 5)).unwrap_err();
        assert!(matches!(err, HybridError::Wwz(_)));
    }
}
