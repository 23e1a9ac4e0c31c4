//! Period extraction from a hybrid correlation matrix.
//!
//! The matrix is collapsed to a normalised profile over frequency, resampled
//! at half the grid spacing, and searched for peaks. Each peak carries
//! asymmetric period errors derived from the full width at half maximum and
//! the quartiles of the profile inside that width.

use qhx_stats::{CubicSpline, interp_linear, mquantiles};
use qhx_wwz::FrequencyGrid;
use tracing::debug;

use crate::error::HybridError;
use crate::peaks::find_peaks;

/// Error value reported when no half-maximum crossing bounds the peak.
pub const DEGENERATE_ERROR: f64 = -1.0;

/// Samples on each side of a peak used for the quartile crossings.
const FLANK: usize = 5;

/// Thresholds for peak detection.
#[derive(Clone, Debug, PartialEq)]
pub struct PeakConfig {
    peak_height: f64,
    prominence: f64,
    fwhm_fraction: f64,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            peak_height: 0.6,
            prominence: 0.7,
            fwhm_fraction: 0.5,
        }
    }
}

impl PeakConfig {
    /// Creates a configuration with the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum normalised peak height.
    pub fn with_peak_height(mut self, peak_height: f64) -> Self {
        self.peak_height = peak_height;
        self
    }

    /// Sets the minimum peak prominence.
    pub fn with_prominence(mut self, prominence: f64) -> Self {
        self.prominence = prominence;
        self
    }

    /// Sets the fraction of the peak height that defines the width.
    pub fn with_fwhm_fraction(mut self, fraction: f64) -> Self {
        self.fwhm_fraction = fraction;
        self
    }

    /// Returns the minimum peak height.
    pub fn peak_height(&self) -> f64 {
        self.peak_height
    }

    /// Returns the minimum prominence.
    pub fn prominence(&self) -> f64 {
        self.prominence
    }

    /// Returns the width fraction.
    pub fn fwhm_fraction(&self) -> f64 {
        self.fwhm_fraction
    }

    /// Checks that every threshold is finite and the fraction lies in `(0, 1)`.
    pub fn validate(&self) -> Result<(), HybridError> {
        if !self.peak_height.is_finite() || !self.prominence.is_finite() {
            return Err(HybridError::InvalidConfig(
                "peak height and prominence must be finite".to_string(),
            ));
        }
        if !(self.fwhm_fraction > 0.0 && self.fwhm_fraction < 1.0) {
            return Err(HybridError::InvalidConfig(format!(
                "fwhm fraction must lie in (0, 1), got {}",
                self.fwhm_fraction
            )));
        }
        Ok(())
    }
}

/// One detected period.
#[derive(Clone, Debug, PartialEq)]
pub struct Peak {
    /// Index into the fine frequency grid.
    pub index: usize,
    /// Frequency of the peak (1/day).
    pub frequency: f64,
    /// `1 / frequency`.
    pub period: f64,
    /// Error towards longer periods, or [`DEGENERATE_ERROR`].
    pub upper_error: f64,
    /// Error towards shorter periods, or [`DEGENERATE_ERROR`].
    pub lower_error: f64,
}

impl Peak {
    /// Returns `true` unless the upper error is the degenerate marker.
    pub fn upper_error_known(&self) -> bool {
        self.upper_error != DEGENERATE_ERROR
    }

    /// Returns `true` unless the lower error is the degenerate marker.
    pub fn lower_error_known(&self) -> bool {
        self.lower_error != DEGENERATE_ERROR
    }
}

/// Peaks together with the resampled profile they were found on.
#[derive(Clone, Debug)]
pub struct PeriodDetection {
    /// Peaks in ascending frequency order.
    pub peaks: Vec<Peak>,
    /// Normalised correlation profile on the fine grid.
    pub profile: Vec<f64>,
    /// Fine-grid frequencies matching `profile`.
    pub frequencies: Vec<f64>,
}

impl PeriodDetection {
    /// Periods of all peaks.
    pub fn periods(&self) -> Vec<f64> {
        self.peaks.iter().map(|p| p.period).collect()
    }

    /// Fine-grid indices of all peaks.
    pub fn indices(&self) -> Vec<usize> {
        self.peaks.iter().map(|p| p.index).collect()
    }

    /// Returns `true` when no peak passed the thresholds.
    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }
}

/// Row sums of `|corr|`, divided by the largest row sum.
///
/// Returns all zeros when every row sums to zero (or to something
/// non-finite).
pub fn correlation_profile(corr: &[Vec<f64>]) -> Vec<f64> {
    let sums: Vec<f64> = corr
        .iter()
        .map(|row| row.iter().map(|v| v.abs()).sum())
        .collect();
    let max = sums.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(max > 0.0 && max.is_finite()) {
        return vec![0.0; sums.len()];
    }
    sums.into_iter().map(|s| s / max).collect()
}

/// Profile of `corr` resampled onto the fine frequency grid.
///
/// # Errors
///
/// [`HybridError::GridMismatch`] when `corr` does not have one row per grid
/// frequency.
pub fn interpolated_profile(
    corr: &[Vec<f64>],
    grid: &FrequencyGrid,
) -> Result<Vec<f64>, HybridError> {
    if corr.len() != grid.n_freq() {
        return Err(HybridError::GridMismatch {
            len: corr.len(),
            expected: grid.n_freq(),
        });
    }
    let profile = correlation_profile(corr);
    Ok(interp_linear(&grid.frequencies(), &profile, &grid.fine_frequencies()))
}

/// Width measurements around one peak.
#[derive(Clone, Debug, PartialEq)]
pub struct FullWidth {
    /// `fraction * y[peak]`.
    pub half_max: f64,
    /// First x inside the width on the low side, if the profile drops
    /// below `half_max` there.
    pub x_low: Option<f64>,
    /// Last x inside the width on the high side, if the profile drops
    /// below `half_max` there.
    pub x_high: Option<f64>,
    /// 25th and 75th percentiles of the profile inside the width.
    pub quartiles: Option<(f64, f64)>,
    /// x where the rising flank reaches the 25th percentile.
    pub low_crossing: Option<f64>,
    /// x where the falling flank reaches the 75th percentile.
    pub high_crossing: Option<f64>,
}

/// Measures the width of the peak at `peak` on the curve `(x, y)`.
///
/// The quartile crossings are only computed when more than [`FLANK`]
/// samples precede the peak.
pub fn full_width(x: &[f64], y: &[f64], peak: usize, fraction: f64) -> FullWidth {
    let n = y.len().min(x.len());
    let half_max = y[peak] * fraction;

    let x_low = (0..peak)
        .rev()
        .find(|&i| y[i] < half_max)
        .map(|i| x[i + 1]);
    let x_high = (peak + 1..n).find(|&i| y[i] < half_max).map(|i| x[i - 1]);

    let mut width = FullWidth {
        half_max,
        x_low,
        x_high,
        quartiles: None,
        low_crossing: None,
        high_crossing: None,
    };
    if peak <= FLANK || n == 0 {
        return width;
    }

    let lo = x_low.unwrap_or(x[0]);
    let hi = x_high.unwrap_or(x[n - 1]);
    let inside: Vec<f64> = (0..n)
        .filter(|&i| x[i] >= lo && x[i] <= hi)
        .map(|i| y[i])
        .collect();
    let q = mquantiles(&inside, &[0.25, 0.75]);
    let (q25, q75) = (q[0], q[1]);
    if !(q25.is_finite() && q75.is_finite()) {
        return width;
    }
    width.quartiles = Some((q25, q75));

    let rising = peak - FLANK..peak;
    let falling = peak..(peak + FLANK).min(n);
    width.low_crossing = inverse_interp(&y[rising.clone()], &x[rising], q25);
    width.high_crossing = inverse_interp(&y[falling.clone()], &x[falling], q75);
    width
}

/// x at which the curve sampled by `(ys, xs)` takes the value `target`.
///
/// Uses a cubic spline through the points with `y` as the abscissa, and
/// falls back to linear interpolation over the distinct `y` values when the
/// spline cannot be built. Extrapolates past the sampled range.
fn inverse_interp(ys: &[f64], xs: &[f64], target: f64) -> Option<f64> {
    let value = match CubicSpline::new(ys, xs) {
        Some(spline) => spline.eval(target),
        None => {
            let mut pairs: Vec<(f64, f64)> = ys
                .iter()
                .copied()
                .zip(xs.iter().copied())
                .filter(|(y, x)| y.is_finite() && x.is_finite())
                .collect();
            pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
            pairs.dedup_by(|a, b| a.0 == b.0);
            if pairs.len() < 2 {
                return None;
            }
            let (yp, xp): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
            interp_linear(&yp, &xp, &[target])[0]
        }
    };
    value.is_finite().then_some(value)
}

/// Period errors `(upper, lower)` for the peak at `peak`.
///
/// Each side is `|1/x[peak] - 1/crossing|`, or [`DEGENERATE_ERROR`] when
/// the profile never falls below the width threshold on that side or the
/// crossing could not be located.
pub fn period_errors(x: &[f64], y: &[f64], peak: usize, fraction: f64) -> (f64, f64) {
    let width = full_width(x, y, peak, fraction);
    let period = 1.0 / x[peak];
    let error = |bound: Option<f64>, crossing: Option<f64>| match (bound, crossing) {
        (Some(_), Some(c)) if c != 0.0 => {
            let e = (period - 1.0 / c).abs();
            if e.is_finite() { e } else { DEGENERATE_ERROR }
        }
        _ => DEGENERATE_ERROR,
    };
    (
        error(width.x_low, width.low_crossing),
        error(width.x_high, width.high_crossing),
    )
}

/// Finds periods in a hybrid correlation matrix.
///
/// `corr` must have one row per frequency of `grid`, in ascending order.
/// Peaks are reported in ascending frequency order.
///
/// # Errors
///
/// [`HybridError::GridMismatch`] when the matrix does not fit the grid and
/// [`HybridError::InvalidConfig`] for bad thresholds.
pub fn periods(
    corr: &[Vec<f64>],
    grid: &FrequencyGrid,
    config: &PeakConfig,
) -> Result<PeriodDetection, HybridError> {
    config.validate()?;
    let profile = interpolated_profile(corr, grid)?;
    let frequencies = grid.fine_frequencies();

    let peaks: Vec<Peak> = find_peaks(&profile, config.peak_height, config.prominence)
        .into_iter()
        .map(|index| {
            let (upper_error, lower_error) =
                period_errors(&frequencies, &profile, index, config.fwhm_fraction);
            let frequency = frequencies[index];
            Peak {
                index,
                frequency,
                period: 1.0 / frequency,
                upper_error,
                lower_error,
            }
        })
        .collect();
    debug!(n_peaks = peaks.len(), "period extraction done");

    Ok(PeriodDetection {
        peaks,
        profile,
        frequencies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn gaussian(x: &[f64], centre: f64, width: f64) -> Vec<f64> {
        x.iter()
            .map(|&v| (-0.5 * ((v - centre) / width).powi(2)).exp())
            .collect()
    }

    #[test]
    fn profile_is_normalised_abs_row_sum() {
        let corr = vec![vec![1.0, -1.0], vec![-4.0, 0.0], vec![0.0, 0.0]];
        let p = correlation_profile(&corr);
        assert_eq!(p, vec![0.5, 1.0, 0.0]);
        assert_eq!(correlation_profile(&[vec![0.0], vec![0.0]]), vec![0.0, 0.0]);
    }

    #[test]
    fn grid_mismatch_is_rejected() {
        let grid = FrequencyGrid::new(4, 100.0, 10.0).unwrap();
        let corr = vec![vec![0.0; 3]; 3];
        assert!(matches!(
            periods(&corr, &grid, &PeakConfig::default()),
            Err(HybridError::GridMismatch { len: 3, expected: 5 })
        ));
    }

    #[test]
    fn missing_left_crossing_gives_sentinel() {
        let mut y = vec![0.9, 0.92, 0.94, 0.96, 0.97, 0.98, 0.99, 0.995, 1.0, 0.8, 0.4, 0.1];
        y.extend([0.0; 6]);
        let x: Vec<f64> = (0..y.len()).map(|i| 0.01 * (i + 1) as f64).collect();
        let w = full_width(&x, &y, 8, 0.5);
        assert_eq!(w.x_low, None);
        assert_relative_eq!(w.x_high.unwrap(), 0.10, epsilon = 1e-12);

        let (upper, lower) = period_errors(&x, &y, 8, 0.5);
        assert_eq!(upper, DEGENERATE_ERROR);
        assert!(lower.is_finite());
        assert!(lower >= 0.0);
        assert_ne!(lower, DEGENERATE_ERROR);
    }

    #[test]
    fn peak_near_start_has_no_errors() {
        let x: Vec<f64> = (0..30).map(|i| 0.01 * (i + 1) as f64).collect();
        let y = gaussian(&x, x[3], 0.02);
        assert_eq!(period_errors(&x, &y, 3, 0.5), (DEGENERATE_ERROR, DEGENERATE_ERROR));
    }

    #[test]
    fn symmetric_peak_has_both_errors() {
        let x: Vec<f64> = (0..60).map(|i| 0.001 * (i + 1) as f64).collect();
        let y = gaussian(&x, x[30], 0.005);
        let w = full_width(&x, &y, 30, 0.5);
        assert!(w.x_low.unwrap() < x[30]);
        assert!(w.x_high.unwrap() > x[30]);
        let (q25, q75) = w.quartiles.unwrap();
        assert!(q25 <= q75);

        let (upper, lower) = period_errors(&x, &y, 30, 0.5);
        assert!(upper > 0.0 && upper.is_finite());
        assert!(lower > 0.0 && lower.is_finite());
    }

    #[test]
    fn periods_on_synthetic_matrix() {
        let grid = FrequencyGrid::new(40, 200.0, 10.0).unwrap();
        let f = grid.frequencies();
        let centre = 1.0 / 50.0;
        let bump = gaussian(&f, centre, 2.0 * grid.freq_step());
        // one row per frequency, each row sums to the bump height
        let corr: Vec<Vec<f64>> = bump.iter().map(|&b| vec![b, b]).collect();

        let det = periods(&corr, &grid, &PeakConfig::default()).unwrap();
        assert_eq!(det.profile.len(), 2 * grid.n_freq());
        assert_eq!(det.frequencies.len(), det.profile.len());
        assert_eq!(det.peaks.len(), 1);
        let p = &det.peaks[0];
        assert_relative_eq!(p.period, 50.0, max_relative = 0.05);
        assert_relative_eq!(p.frequency * p.period, 1.0, epsilon = 1e-12);
        assert_eq!(det.indices(), vec![p.index]);
    }

    #[test]
    fn invalid_fraction_rejected() {
        assert!(PeakConfig::new().with_fwhm_fraction(1.5).validate().is_err());
        assert!(PeakConfig::new().validate().is_ok());
    }
}
