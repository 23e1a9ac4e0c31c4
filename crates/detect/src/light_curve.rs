//! Single-band light curves and their standard cleaning steps.

use std::f64::consts::PI;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::DetectError;

/// Default multiple of the MAD (or of sigma) beyond which a point is an outlier.
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 3.0;

/// Time-ordered brightness measurements of one object in one band.
///
/// Construction sorts by time and drops rows with a non-finite time,
/// magnitude or error. The curve is immutable afterwards; cleaning steps
/// return new curves.
#[derive(Clone, Debug, PartialEq)]
pub struct LightCurve {
    time: Vec<f64>,
    magnitude: Vec<f64>,
    errors: Option<Vec<f64>>,
}

impl LightCurve {
    /// Builds a light curve from parallel columns.
    ///
    /// # Errors
    ///
    /// [`DetectError::LengthMismatch`] when the columns differ in length.
    pub fn new(
        time: Vec<f64>,
        magnitude: Vec<f64>,
        errors: Option<Vec<f64>>,
    ) -> Result<Self, DetectError> {
        let n_err = errors.as_ref().map_or(0, Vec::len);
        if time.len() != magnitude.len() || errors.as_ref().is_some_and(|e| e.len() != time.len()) {
            return Err(DetectError::LengthMismatch {
                time: time.len(),
                magnitude: magnitude.len(),
                errors: n_err,
            });
        }

        let mut order: Vec<usize> = (0..time.len())
            .filter(|&i| {
                time[i].is_finite()
                    && magnitude[i].is_finite()
                    && errors.as_ref().is_none_or(|e| e[i].is_finite())
            })
            .collect();
        order.sort_by(|&a, &b| time[a].total_cmp(&time[b]));

        Ok(Self::select(&time, &magnitude, errors.as_deref(), &order))
    }

    fn select(time: &[f64], magnitude: &[f64], errors: Option<&[f64]>, keep: &[usize]) -> Self {
        Self {
            time: keep.iter().map(|&i| time[i]).collect(),
            magnitude: keep.iter().map(|&i| magnitude[i]).collect(),
            errors: errors.map(|e| keep.iter().map(|&i| e[i]).collect()),
        }
    }

    fn retain(&self, keep: impl Fn(usize) -> bool) -> Self {
        let idx: Vec<usize> = (0..self.len()).filter(|&i| keep(i)).collect();
        Self::select(&self.time, &self.magnitude, self.errors.as_deref(), &idx)
    }

    /// Observation times (days), ascending.
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Magnitudes.
    pub fn magnitude(&self) -> &[f64] {
        &self.magnitude
    }

    /// Magnitude errors, if the survey provides them.
    pub fn errors(&self) -> Option<&[f64]> {
        self.errors.as_deref()
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Returns `true` when there are no observations.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Mean interval between consecutive observations, 0 with fewer than two.
    pub fn mean_sampling(&self) -> f64 {
        match (self.time.first(), self.time.last()) {
            (Some(first), Some(last)) if self.len() > 1 => (last - first) / (self.len() - 1) as f64,
            _ => 0.0,
        }
    }

    /// Drops the magnitude errors.
    pub fn without_errors(mut self) -> Self {
        self.errors = None;
        self
    }

    /// Removes points farther than `threshold_factor * MAD` from the median
    /// magnitude.
    ///
    /// When errors are present the threshold is widened by their median.
    pub fn outliers_mad(&self, threshold_factor: f64) -> Self {
        if self.is_empty() {
            return self.clone();
        }
        let median = qhx_stats::median_of(&self.magnitude);
        let mut threshold = threshold_factor * qhx_stats::median_abs_deviation(&self.magnitude);
        if let Some(errors) = &self.errors {
            threshold += qhx_stats::median_of(errors);
        }
        self.retain(|i| (self.magnitude[i] - median).abs() <= threshold)
    }

    /// Removes points whose z-score exceeds `threshold`.
    ///
    /// When errors are present a point must also lie within `threshold`
    /// of its own error from the mean. A constant curve keeps every point.
    pub fn outliers_zscore(&self, threshold: f64) -> Self {
        let mean = qhx_stats::mean(&self.magnitude);
        let std = qhx_stats::std_population(&self.magnitude);
        self.retain(|i| {
            let dev = (self.magnitude[i] - mean).abs();
            let z = if std > 0.0 { dev / std } else { 0.0 };
            let z_err = self.errors.as_ref().map_or(0.0, |e| dev / e[i]);
            z <= threshold && z_err <= threshold
        })
    }

    /// Adds one Gaussian draw per point with the point's error as sigma.
    ///
    /// Curves without errors are returned unchanged. Negative or zero
    /// errors leave their point unchanged.
    pub fn perturbed<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let Some(errors) = &self.errors else {
            return self.clone();
        };
        let magnitude = self
            .magnitude
            .iter()
            .zip(errors)
            .map(|(&m, &e)| match Normal::new(0.0, e) {
                Ok(noise) if e > 0.0 => m + noise.sample(rng),
                _ => m,
            })
            .collect();
        Self {
            time: self.time.clone(),
            magnitude,
            errors: self.errors.clone(),
        }
    }
    /// Adds a damped oscillation, returning the new curve and the values added.
    ///
    /// The signal is evaluated on a regular grid five times denser than the
    /// curve, from the first to the last observation with time measured from
    /// the first, then linearly interpolated to the observation times. With
    /// an SNR set it is scaled by `sqrt(var(magnitude) * snr)`. Points where
    /// the signal is not finite are dropped from the returned curve.
    pub fn inject_tiktok(&self, signal: &TiktokSignal) -> (Self, Vec<f64>) {
        let injected = match (self.time.first(), self.time.last()) {
            (Some(&first), Some(&last)) if last > first => {
                let n = 5 * self.len();
                let step = (last - first) / (n - 1) as f64;
                let grid: Vec<f64> = (0..n).map(|i| first + step * i as f64).collect();
                let offsets: Vec<f64> = grid.iter().map(|t| t - first).collect();
                let regular = signal.evaluate(&offsets);
                qhx_stats::interp_linear(&grid, &regular, &self.time)
            }
            (Some(&first), _) => {
                let offsets: Vec<f64> = self.time.iter().map(|t| t - first).collect();
                signal.evaluate(&offsets)
            }
            _ => Vec::new(),
        };
        let scale = match signal.snr {
            Some(snr) => {
                let std = qhx_stats::std_population(&self.magnitude);
                (std * std * snr).sqrt()
            }
            None => 1.0,
        };
        let injected: Vec<f64> = injected.into_iter().map(|v| v * scale).collect();

        let magnitude: Vec<f64> = self.magnitude.iter().zip(&injected).map(|(m, s)| m + s).collect();
        let keep: Vec<usize> = (0..self.len()).filter(|&i| magnitude[i].is_finite()).collect();
        let curve = Self::select(&self.time, &magnitude, self.errors.as_deref(), &keep);
        (curve, injected)
    }
}

/// Damped oscillation whose amplitude and period shrink exponentially.
///
/// At time `t` from the start the value is
/// `exp(-amplitude_damping * t) * sin(2π t / (initial_period * exp(-frequency_damping * t)))`.
#[derive(Clone, Debug, PartialEq)]
pub struct TiktokSignal {
    initial_period: f64,
    amplitude_damping: f64,
    frequency_damping: f64,
    snr: Option<f64>,
}

impl TiktokSignal {
    /// Creates an unscaled signal.
    ///
    /// # Errors
    ///
    /// [`DetectError::InvalidConfig`] unless the period is positive and
    /// both damping factors are finite.
    pub fn new(
        initial_period: f64,
        amplitude_damping: f64,
        frequency_damping: f64,
    ) -> Result<Self, DetectError> {
        if !(initial_period.is_finite() && initial_period > 0.0) {
            return Err(DetectError::InvalidConfig(format!(
                "initial_period must be positive and finite, got {initial_period}"
            )));
        }
        if !(amplitude_damping.is_finite() && frequency_damping.is_finite()) {
            return Err(DetectError::InvalidConfig(
                "damping factors must be finite".to_string(),
            ));
        }
        Ok(Self {
            initial_period,
            amplitude_damping,
            frequency_damping,
            snr: None,
        })
    }

    /// Scales the signal power to `snr` times the curve's magnitude variance.
    ///
    /// # Errors
    ///
    /// [`DetectError::InvalidConfig`] for a negative or non-finite ratio.
    pub fn with_snr(mut self, snr: f64) -> Result<Self, DetectError> {
        if !(snr.is_finite() && snr >= 0.0) {
            return Err(DetectError::InvalidConfig(format!(
                "snr must be finite and >= 0, got {snr}"
            )));
        }
        self.snr = Some(snr);
        Ok(self)
    }

    pub fn initial_period(&self) -> f64 {
        self.initial_period
    }

    pub fn amplitude_damping(&self) -> f64 {
        self.amplitude_damping
    }

    pub fn frequency_damping(&self) -> f64 {
        self.frequency_damping
    }

    pub fn snr(&self) -> Option<f64> {
        self.snr
    }

    /// Unscaled values at `offsets` from the start of the signal.
    pub fn evaluate(&self, offsets: &[f64]) -> Vec<f64> {
        generate_tiktok_signal(
            offsets,
            self.initial_period,
            self.amplitude_damping,
            self.frequency_damping,
        )
    }
}

/// Damped oscillation at each of `time`; see [`TiktokSignal`].
pub fn generate_tiktok_signal(
    time: &[f64],
    initial_period: f64,
    amplitude_damping: f64,
    frequency_damping: f64,
) -> Vec<f64> {
    time.iter()
        .map(|&t| {
            let frequency = 1.0 / (initial_period * (-frequency_damping * t).exp());
            let amplitude = (-amplitude_damping * t).exp();
            amplitude * (2.0 * PI * frequency * t).sin()
        })
        .collect()
}
