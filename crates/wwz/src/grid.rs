//! Linear frequency grid and transform parameters.
//!
//! Period bounds are given in the time unit of the light curve (days). The
//! grid always runs from the frequency of the longer period bound up to the
//! frequency of the shorter one, in `ngrid` equal steps.

use std::f64::consts::PI;

use crate::error::WwzError;

/// Default decay factor of the Gaussian time window.
pub const DEFAULT_DECAY_FACTOR: f64 = 2.0;

/// `1 / (2 (2π decay_factor)^2)`, the window decay constant used by the transform.
pub fn decay_constant(decay_factor: f64) -> f64 {
    1.0 / (2.0 * (2.0 * PI * decay_factor).powi(2))
}

/// Parameters of the weighted wavelet Z-transform.
///
/// The period bounds have no default: they must be set with
/// [`with_period_bounds`](Self::with_period_bounds) (or estimated with
/// [`estimate_wavelet_periods`]) before a grid can be built.
///
/// # Example
///
/// ```ignore
/// use qhx_wwz::WwzConfig;
///
/// let config = WwzConfig::new(80, 800).with_period_bounds(2000.0, 10.0);
/// let grid = config.grid()?;
/// assert_eq!(grid.n_freq(), 801);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct WwzConfig {
    /// Number of time divisions (window centres).
    ntau: usize,
    /// Number of frequency steps.
    ngrid: usize,
    /// Longer period bound; sets the lowest frequency.
    min_period: Option<f64>,
    /// Shorter period bound; sets the highest frequency.
    max_period: Option<f64>,
    decay_factor: f64,
}

impl WwzConfig {
    /// Creates a configuration with `ntau` time divisions and `ngrid`
    /// frequency steps, no period bounds, and the default decay factor.
    pub fn new(ntau: usize, ngrid: usize) -> Self {
        Self {
            ntau,
            ngrid,
            min_period: None,
            max_period: None,
            decay_factor: DEFAULT_DECAY_FACTOR,
        }
    }

    /// Sets the period bounds.
    ///
    /// `min_period` names the bound that maps to the minimum frequency, so it
    /// is usually the longer period (e.g. `2000.0, 10.0`). The two bounds may
    /// be given in either order.
    pub fn with_period_bounds(mut self, min_period: f64, max_period: f64) -> Self {
        self.min_period = Some(min_period);
        self.max_period = Some(max_period);
        self
    }

    /// Sets the decay factor of the time window.
    pub fn with_decay_factor(mut self, decay_factor: f64) -> Self {
        self.decay_factor = decay_factor;
        self
    }

    /// Sets the number of time divisions.
    pub fn with_ntau(mut self, ntau: usize) -> Self {
        self.ntau = ntau;
        self
    }

    /// Returns the number of time divisions.
    pub fn ntau(&self) -> usize {
        self.ntau
    }

    /// Returns the number of frequency steps.
    pub fn ngrid(&self) -> usize {
        self.ngrid
    }

    /// Returns the period bound mapped to the minimum frequency, if set.
    pub fn min_period(&self) -> Option<f64> {
        self.min_period
    }

    /// Returns the period bound mapped to the maximum frequency, if set.
    pub fn max_period(&self) -> Option<f64> {
        self.max_period
    }

    /// Returns the decay factor.
    pub fn decay_factor(&self) -> f64 {
        self.decay_factor
    }

    /// Returns the window decay constant.
    pub fn decay_constant(&self) -> f64 {
        decay_constant(self.decay_factor)
    }

    /// Builds the frequency grid.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`WwzError::InvalidFrequencyBounds`] | a bound is unset, non-finite, non-positive, or both are equal |
    /// | [`WwzError::InvalidGrid`] | `ngrid == 0`, `ntau == 0`, or the decay factor is not positive |
    pub fn grid(&self) -> Result<FrequencyGrid, WwzError> {
        if self.ntau == 0 {
            return Err(WwzError::InvalidGrid("ntau must be > 0".into()));
        }
        if !(self.decay_factor.is_finite() && self.decay_factor > 0.0) {
            return Err(WwzError::InvalidGrid(format!(
                "decay_factor must be finite and > 0, got {}",
                self.decay_factor
            )));
        }
        let min_period = self.min_period.ok_or_else(|| WwzError::InvalidFrequencyBounds {
            reason: "min_period is not set".into(),
        })?;
        let max_period = self.max_period.ok_or_else(|| WwzError::InvalidFrequencyBounds {
            reason: "max_period is not set".into(),
        })?;
        FrequencyGrid::new(self.ngrid, min_period, max_period)
    }
}

impl Default for WwzConfig {
    fn default() -> Self {
        Self::new(80, 800)
    }
}

/// Equally spaced frequencies between two period bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrequencyGrid {
    ngrid: usize,
    freq_min: f64,
    freq_max: f64,
    freq_step: f64,
}

impl FrequencyGrid {
    /// Builds the grid `1/longer .. 1/shorter` with `ngrid` steps.
    ///
    /// # Errors
    ///
    /// [`WwzError::InvalidFrequencyBounds`] for non-finite, non-positive or
    /// equal bounds; [`WwzError::InvalidGrid`] for `ngrid == 0`.
    pub fn new(ngrid: usize, period_a: f64, period_b: f64) -> Result<Self, WwzError> {
        if ngrid == 0 {
            return Err(WwzError::InvalidGrid("ngrid must be > 0".into()));
        }
        for p in [period_a, period_b] {
            if !(p.is_finite() && p > 0.0) {
                return Err(WwzError::InvalidFrequencyBounds {
                    reason: format!("period bound {p} must be finite and > 0"),
                });
            }
        }
        if period_a == period_b {
            return Err(WwzError::InvalidFrequencyBounds {
                reason: format!("period bounds are equal ({period_a})"),
            });
        }
        let freq_min = 1.0 / period_a.max(period_b);
        let freq_max = 1.0 / period_a.min(period_b);
        Ok(Self {
            ngrid,
            freq_min,
            freq_max,
            freq_step: (freq_max - freq_min) / ngrid as f64,
        })
    }

    /// Returns the number of frequency steps.
    pub fn ngrid(&self) -> usize {
        self.ngrid
    }

    /// Returns the lowest frequency.
    pub fn freq_min(&self) -> f64 {
        self.freq_min
    }

    /// Returns the highest frequency.
    pub fn freq_max(&self) -> f64 {
        self.freq_max
    }

    /// Returns the frequency spacing.
    pub fn freq_step(&self) -> f64 {
        self.freq_step
    }

    /// Returns the number of grid frequencies, `ngrid + 1`.
    pub fn n_freq(&self) -> usize {
        self.ngrid + 1
    }

    /// Grid frequencies `freq_min + i * freq_step` for `i = 0..=ngrid`.
    pub fn frequencies(&self) -> Vec<f64> {
        (0..self.n_freq())
            .map(|i| self.freq_min + i as f64 * self.freq_step)
            .collect()
    }

    /// Frequencies at half the grid spacing, `2 * (ngrid + 1)` points.
    ///
    /// The last point lies half a step beyond `freq_max`.
    pub fn fine_frequencies(&self) -> Vec<f64> {
        let half = self.freq_step / 2.0;
        (0..2 * self.n_freq())
            .map(|k| self.freq_min + k as f64 * half)
            .collect()
    }
}

/// Period bounds derived from the sampling of `time`.
///
/// Returns `(longer, shorter)` in the argument order of
/// [`WwzConfig::with_period_bounds`]. The longer bound is half the time
/// span. The shorter bound is `max(2 / (0.5 * dt), 0.1 * span)`, with `dt`
/// the mean sampling interval, so it never drops below a tenth of the
/// span. A `known_period` widens the bounds so that it lies at least a
/// factor of two inside them. Returns `None` for fewer than two finite
/// timestamps, a zero span, or bounds that cross.
pub fn estimate_wavelet_periods(time: &[f64], known_period: Option<f64>) -> Option<(f64, f64)> {
    let mut t: Vec<f64> = time.iter().copied().filter(|v| v.is_finite()).collect();
    if t.len() < 2 {
        return None;
    }
    t.sort_by(f64::total_cmp);
    let span = t[t.len() - 1] - t[0];
    if span <= 0.0 {
        return None;
    }
    let gaps: Vec<f64> = t.windows(2).map(|w| w[1] - w[0]).collect();
    let sampling = qhx_stats::mean(&gaps);
    let nyquist_period = 1.0 / (0.5 * sampling);

    let mut longer = 0.5 * span;
    let mut shorter = (2.0 * nyquist_period).max(0.1 * span);
    if let Some(p) = known_period.filter(|p| p.is_finite() && *p > 0.0) {
        longer = longer.max(2.0 * p);
        shorter = shorter.min(p / 2.0);
    }
    if shorter >= longer {
        return None;
    }
    Some((longer, shorter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn config_defaults() {
        let config = WwzConfig::default();
        assert_eq!(config.ntau(), 80);
        assert_eq!(config.ngrid(), 800);
        assert!(config.min_period().is_none());
        assert_eq!(config.decay_factor(), DEFAULT_DECAY_FACTOR);
    }

    #[test]
    fn decay_constant_default_factor() {
        // 1 / (2 * (4π)^2)
        assert_relative_eq!(
            decay_constant(2.0),
            1.0 / (32.0 * PI * PI),
            epsilon = 1e-15
        );
    }

    #[test]
    fn grid_requires_bounds() {
        let err = WwzConfig::new(10, 10).grid().unwrap_err();
        assert!(matches!(err, WwzError::InvalidFrequencyBounds { .. }));
    }

    #[test]
    fn grid_rejects_bad_bounds() {
        for (a, b) in [(10.0, 10.0), (0.0, 10.0), (-5.0, 10.0), (f64::NAN, 1.0)] {
            let err = FrequencyGrid::new(10, a, b).unwrap_err();
            assert!(matches!(err, WwzError::InvalidFrequencyBounds { .. }));
        }
        assert!(matches!(
            FrequencyGrid::new(0, 100.0, 10.0),
            Err(WwzError::InvalidGrid(_))
        ));
        assert!(matches!(
            WwzConfig::new(0, 10).with_period_bounds(100.0, 10.0).grid(),
            Err(WwzError::InvalidGrid(_))
        ));
    }

    #[test]
    fn grid_derivation() {
        let grid = WwzConfig::new(80, 800)
            .with_period_bounds(2000.0, 10.0)
            .grid()
            .unwrap();
        assert_relative_eq!(grid.freq_min(), 0.0005);
        assert_relative_eq!(grid.freq_max(), 0.1);
        assert_relative_eq!(grid.freq_step(), 0.0995 / 800.0, max_relative = 1e-12);
        let f = grid.frequencies();
        assert_eq!(f.len(), 801);
        assert_relative_eq!(f[800], 0.1, epsilon = 1e-12);
    }

    #[test]
    fn bounds_order_does_not_matter() {
        let a = FrequencyGrid::new(50, 500.0, 20.0).unwrap();
        let b = FrequencyGrid::new(50, 20.0, 500.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn fine_grid_has_double_resolution() {
        let grid = FrequencyGrid::new(4, 10.0, 2.0).unwrap();
        let fine = grid.fine_frequencies();
        assert_eq!(fine.len(), 10);
        assert_relative_eq!(fine[0], grid.freq_min());
        assert_relative_eq!(fine[8], grid.freq_max(), epsilon = 1e-12);
        assert_relative_eq!(fine[1] - fine[0], grid.freq_step() / 2.0, epsilon = 1e-15);
    }

    #[test]
    fn estimate_periods_floor_at_tenth_of_span() {
        let t: Vec<f64> = (0..=200).map(|i| i as f64 * 10.0).collect();
        let (longer, shorter) = estimate_wavelet_periods(&t, None).unwrap();
        assert_relative_eq!(longer, 1000.0);
        assert_relative_eq!(shorter, 200.0);
    }

    #[test]
    fn estimate_periods_nyquist_term_wins_for_sparse_sampling() {
        // dt = 0.1 over a span of 30: 2 / (0.5 * 0.1) = 40 > 0.1 * 30
        let t: Vec<f64> = (0..=300).map(|i| i as f64 * 0.1).collect();
        assert!(estimate_wavelet_periods(&t, None).is_none());

        // dt = 0.5 over a span of 500: 8 < 50
        let t: Vec<f64> = (0..=1000).map(|i| i as f64 * 0.5).collect();
        let (longer, shorter) = estimate_wavelet_periods(&t, None).unwrap();
        assert_relative_eq!(longer, 250.0);
        assert_relative_eq!(shorter, 50.0);
    }

    #[test]
    fn estimate_periods_widens_for_known_period() {
        let t: Vec<f64> = (0..=200).map(|i| i as f64 * 10.0).collect();
        let (longer, shorter) = estimate_wavelet_periods(&t, Some(100.0)).unwrap();
        assert_relative_eq!(longer, 1000.0);
        assert_relative_eq!(shorter, 50.0);

        let (longer, _) = estimate_wavelet_periods(&t, Some(800.0)).unwrap();
        assert_relative_eq!(longer, 1600.0);
    }

    #[test]
    fn estimate_periods_degenerate() {
        assert!(estimate_wavelet_periods(&[1.0], None).is_none());
        assert!(estimate_wavelet_periods(&[1.0, 1.0, 1.0], None).is_none());
    }
}
