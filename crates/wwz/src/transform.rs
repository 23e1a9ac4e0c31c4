//! The weighted wavelet Z-transform (Foster 1996).
//!
//! At every window centre `tau` and frequency `f` the series is projected
//! onto the trial functions `{1, cos(ω(t-τ)), sin(ω(t-τ))}` with Gaussian
//! weights `exp(-c (ω(t-τ))^2)`. The Z statistic compares the variance
//! explained by the fit with the residual variance, scaled by the effective
//! number of points under the window.

use std::f64::consts::PI;

use rayon::prelude::*;
use tracing::debug;

use crate::error::WwzError;
use crate::grid::{FrequencyGrid, WwzConfig};

/// Minimum number of observations for the three-term fit.
pub const MIN_POINTS: usize = 4;

/// Weights whose exponent exceeds this are zero in double precision.
const WEIGHT_CUTOFF: f64 = 700.0;

/// Output planes of the transform, each `[n_freq][n_tau]`.
#[derive(Clone, Debug)]
pub struct WwzResult {
    tau: Vec<f64>,
    freq: Vec<f64>,
    power: Vec<Vec<f64>>,
    amplitude: Vec<Vec<f64>>,
    phase: Vec<Vec<f64>>,
    n_eff: Vec<Vec<f64>>,
}

impl WwzResult {
    /// Returns the window centres.
    pub fn tau(&self) -> &[f64] {
        &self.tau
    }

    /// Returns the grid frequencies, ascending.
    pub fn freq(&self) -> &[f64] {
        &self.freq
    }

    /// Returns the Z statistic `[n_freq][n_tau]`.
    pub fn power(&self) -> &[Vec<f64>] {
        &self.power
    }

    /// Returns the fitted sinusoid amplitude `[n_freq][n_tau]`.
    pub fn amplitude(&self) -> &[Vec<f64>] {
        &self.amplitude
    }

    /// Returns the fitted phase `atan2(b_sin, b_cos)` `[n_freq][n_tau]`.
    pub fn phase(&self) -> &[Vec<f64>] {
        &self.phase
    }

    /// Returns the effective number of points under each window `[n_freq][n_tau]`.
    pub fn n_eff(&self) -> &[Vec<f64>] {
        &self.n_eff
    }

    /// Returns the number of frequencies.
    pub fn n_freq(&self) -> usize {
        self.freq.len()
    }

    /// Returns the number of window centres.
    pub fn n_tau(&self) -> usize {
        self.tau.len()
    }
}

/// Single grid cell.
#[derive(Clone, Copy, Debug, Default)]
struct Cell {
    z: f64,
    amplitude: f64,
    phase: f64,
    n_eff: f64,
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + i as f64 * step).collect()
        }
    }
}

/// Window centres: `ntau` points spanning the observations, capped at the
/// number of observations.
pub fn time_divisions(time: &[f64], ntau: usize) -> Vec<f64> {
    let (Some(&first), Some(&last)) = (time.first(), time.last()) else {
        return Vec::new();
    };
    linspace(first, last, ntau.min(time.len()))
}

/// Computes the transform of `(time, magnitude)` on the grid described by `config`.
///
/// Time divisions are evaluated in parallel. Cells whose fit is singular or
/// whose weights vanish are reported as zero.
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`WwzError::InvalidFrequencyBounds`] / [`WwzError::InvalidGrid`] | see [`WwzConfig::grid`] |
/// | [`WwzError::LengthMismatch`] | `time.len() != magnitude.len()` |
/// | [`WwzError::SeriesTooShort`] | fewer than [`MIN_POINTS`] observations |
/// | [`WwzError::NonFiniteData`] | NaN or infinite input |
pub fn wwz(time: &[f64], magnitude: &[f64], config: &WwzConfig) -> Result<WwzResult, WwzError> {
    let grid = config.grid()?;
    wwz_on_grid(time, magnitude, &grid, config.ntau(), config.decay_constant())
}

/// [`wwz`] with an explicit grid, time-division count and decay constant.
pub fn wwz_on_grid(
    time: &[f64],
    magnitude: &[f64],
    grid: &FrequencyGrid,
    ntau: usize,
    decay_constant: f64,
) -> Result<WwzResult, WwzError> {
    if time.len() != magnitude.len() {
        return Err(WwzError::LengthMismatch {
            time: time.len(),
            magnitude: magnitude.len(),
        });
    }
    if time.len() < MIN_POINTS {
        return Err(WwzError::SeriesTooShort {
            len: time.len(),
            min: MIN_POINTS,
        });
    }
    if time.iter().chain(magnitude.iter()).any(|v| !v.is_finite()) {
        return Err(WwzError::NonFiniteData);
    }
    if ntau == 0 {
        return Err(WwzError::InvalidGrid("ntau must be > 0".into()));
    }

    let tau = time_divisions(time, ntau);
    let freq = grid.frequencies();
    debug!(
        n = time.len(),
        n_tau = tau.len(),
        n_freq = freq.len(),
        "computing WWZ"
    );

    let columns: Vec<Vec<Cell>> = tau
        .par_iter()
        .map(|&t0| {
            freq.iter()
                .map(|&f| fit_cell(time, magnitude, t0, 2.0 * PI * f, decay_constant))
                .collect()
        })
        .collect();

    let plane = |get: fn(&Cell) -> f64| -> Vec<Vec<f64>> {
        (0..freq.len())
            .map(|fi| columns.iter().map(|col| get(&col[fi])).collect())
            .collect()
    };

    Ok(WwzResult {
        power: plane(|c| c.z),
        amplitude: plane(|c| c.amplitude),
        phase: plane(|c| c.phase),
        n_eff: plane(|c| c.n_eff),
        tau,
        freq,
    })
}

/// Weighted least-squares fit at one `(tau, omega)`.
fn fit_cell(time: &[f64], magnitude: &[f64], tau: f64, omega: f64, c: f64) -> Cell {
    let mut sw = 0.0;
    let mut sw2 = 0.0;
    let (mut s_c, mut s_s, mut s_cc, mut s_ss, mut s_cs) = (0.0, 0.0, 0.0, 0.0, 0.0);
    let (mut s_y, mut s_yc, mut s_ys, mut s_yy) = (0.0, 0.0, 0.0, 0.0);

    for (&t, &y) in time.iter().zip(magnitude) {
        let dz = omega * (t - tau);
        let arg = c * dz * dz;
        if arg > WEIGHT_CUTOFF {
            continue;
        }
        let w = (-arg).exp();
        let (sin, cos) = dz.sin_cos();
        sw += w;
        sw2 += w * w;
        s_c += w * cos;
        s_s += w * sin;
        s_cc += w * cos * cos;
        s_ss += w * sin * sin;
        s_cs += w * cos * sin;
        s_y += w * y;
        s_yc += w * y * cos;
        s_ys += w * y * sin;
        s_yy += w * y * y;
    }

    if sw <= f64::MIN_POSITIVE {
        return Cell::default();
    }
    let n_eff = sw * sw / sw2;
    let [c1, s1, cc, ss, cs] = [s_c, s_s, s_cc, s_ss, s_cs].map(|v| v / sw);
    let [y0, yc, ys, yy] = [s_y, s_yc, s_ys, s_yy].map(|v| v / sw);

    let s = [[1.0, c1, s1], [c1, cc, cs], [s1, cs, ss]];
    let rhs = [y0, yc, ys];
    let Some(coef) = qhx_stats::solve_small(s, rhs) else {
        return Cell {
            n_eff,
            ..Cell::default()
        };
    };

    let var_x = yy - y0 * y0;
    let var_y = coef[0] * rhs[0] + coef[1] * rhs[1] + coef[2] * rhs[2] - y0 * y0;
    let resid = var_x - var_y;
    // Variances at rounding level of the mean carry no signal.
    let floor = 1e-12 * yy.abs();
    let z = if var_x > floor && resid > var_x * 1e-12 {
        (n_eff - 3.0) * var_y / (2.0 * resid)
    } else {
        0.0
    };

    Cell {
        z,
        amplitude: coef[1].hypot(coef[2]),
        phase: coef[2].atan2(coef[1]),
        n_eff,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn sampled_sine(n: usize, span: f64, period: f64, amp: f64, seed: u64) -> (Vec<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut t: Vec<f64> = (0..n).map(|_| rng.random::<f64>() * span).collect();
        t.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let y = t
            .iter()
            .map(|&ti| 18.0 + amp * (2.0 * PI * ti / period).sin() + 0.02 * (rng.random::<f64>() - 0.5))
            .collect();
        (t, y)
    }

    #[test]
    fn linspace_endpoints() {
        let v = linspace(2.0, 4.0, 5);
        assert_eq!(v, vec![2.0, 2.5, 3.0, 3.5, 4.0]);
        assert_eq!(linspace(1.0, 9.0, 1), vec![1.0]);
    }

    #[test]
    fn time_divisions_capped_by_length() {
        let t = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(time_divisions(&t, 3), vec![0.0, 2.0, 4.0]);
        assert_eq!(time_divisions(&t, 50).len(), 5);
    }

    #[test]
    fn rejects_bad_input() {
        let config = WwzConfig::new(5, 10).with_period_bounds(50.0, 5.0);
        assert!(matches!(
            wwz(&[0.0, 1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], &config),
            Err(WwzError::LengthMismatch { time: 4, magnitude: 3 })
        ));
        assert!(matches!(
            wwz(&[0.0, 1.0], &[1.0, 2.0], &config),
            Err(WwzError::SeriesTooShort { len: 2, .. })
        ));
        assert!(matches!(
            wwz(&[0.0, 1.0, 2.0, 3.0], &[1.0, f64::NAN, 3.0, 4.0], &config),
            Err(WwzError::NonFiniteData)
        ));
        let unbounded = WwzConfig::new(5, 10);
        assert!(matches!(
            wwz(&[0.0, 1.0, 2.0, 3.0], &[1.0, 2.0, 3.0, 4.0], &unbounded),
            Err(WwzError::InvalidFrequencyBounds { .. })
        ));
    }

    #[test]
    fn output_shape() {
        let (t, y) = sampled_sine(120, 400.0, 50.0, 1.0, 3);
        let config = WwzConfig::new(12, 20).with_period_bounds(200.0, 20.0);
        let result = wwz(&t, &y, &config).unwrap();
        assert_eq!(result.n_tau(), 12);
        assert_eq!(result.n_freq(), 21);
        assert_eq!(result.power().len(), 21);
        assert!(result.power().iter().all(|row| row.len() == 12));
        assert!(result.amplitude().iter().flatten().all(|a| *a >= 0.0));
    }

    #[test]
    fn recovers_amplitude_of_clean_sinusoid() {
        let (t, y) = sampled_sine(400, 1000.0, 50.0, 0.7, 11);
        let grid = FrequencyGrid::new(1, 50.0, 25.0).unwrap();
        let result = wwz_on_grid(&t, &y, &grid, 5, 1.0 / (32.0 * PI * PI)).unwrap();
        // Row 0 is the 50-day frequency; the middle window sits well inside the data.
        assert_relative_eq!(result.amplitude()[0][2], 0.7, epsilon = 0.02);
    }

    #[test]
    fn z_peaks_at_injected_frequency() {
        let (t, y) = sampled_sine(300, 1500.0, 100.0, 1.0, 5);
        let config = WwzConfig::new(10, 40).with_period_bounds(400.0, 40.0);
        let result = wwz(&t, &y, &config).unwrap();
        let mean_z: Vec<f64> = result
            .power()
            .iter()
            .map(|row| row.iter().sum::<f64>() / row.len() as f64)
            .collect();
        let best = mean_z
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        let f_best = result.freq()[best];
        assert!((1.0 / f_best - 100.0).abs() < 10.0, "best period {}", 1.0 / f_best);
    }

    #[test]
    fn constant_series_has_zero_power() {
        let t: Vec<f64> = (0..50).map(|i| i as f64 * 2.0).collect();
        let y = vec![3.0; 50];
        let config = WwzConfig::new(5, 8).with_period_bounds(60.0, 8.0);
        let result = wwz(&t, &y, &config).unwrap();
        assert!(result.power().iter().flatten().all(|z| *z == 0.0));
    }
}
