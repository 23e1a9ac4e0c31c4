//! Synthetic light curves: a sinusoid on red noise, irregularly sampled.

use std::f64::consts::{PI, SQRT_2};
use std::fmt;
use std::str::FromStr;

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, StandardNormal};
use rustfft::FftPlanner;

use crate::error::DetectError;
use crate::light_curve::LightCurve;

/// Spectral exponent of the default red-noise background.
pub const DEFAULT_NOISE_EXPONENT: f64 = 1.8;

/// Unit of [`MockLightCurve::with_time_interval`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimeUnit {
    /// 365 days.
    #[default]
    Year,
    Day,
    Hour,
    Minute,
    Second,
}

impl TimeUnit {
    /// Length of one unit in days.
    pub fn days(self) -> f64 {
        match self {
            TimeUnit::Year => 365.0,
            TimeUnit::Day => 1.0,
            TimeUnit::Hour => 1.0 / 24.0,
            TimeUnit::Minute => 1.0 / 1440.0,
            TimeUnit::Second => 1.0 / 86_400.0,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeUnit::Year => "year",
            TimeUnit::Day => "day",
            TimeUnit::Hour => "hour",
            TimeUnit::Minute => "minute",
            TimeUnit::Second => "second",
        })
    }
}

impl FromStr for TimeUnit {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "year" | "years" | "yr" | "y" => Ok(TimeUnit::Year),
            "day" | "days" | "d" => Ok(TimeUnit::Day),
            "hour" | "hours" | "h" => Ok(TimeUnit::Hour),
            "minute" | "minutes" | "min" => Ok(TimeUnit::Minute),
            "second" | "seconds" | "s" => Ok(TimeUnit::Second),
            other => Err(DetectError::InvalidConfig(format!("unknown time unit '{other}'"))),
        }
    }
}

/// Gaussian noise with a power spectral density proportional to `f^-beta`.
///
/// The output has zero mean and unit variance in expectation. `beta = 0`
/// is white noise, `beta = 2` a random walk. Lengths below two give zeros.
pub fn powerlaw_psd_gaussian<R: Rng + ?Sized>(beta: f64, n: usize, rng: &mut R) -> Vec<f64> {
    if n < 2 {
        return vec![0.0; n];
    }
    let n_half = n / 2 + 1;
    let nf = n as f64;

    // The zero frequency takes the amplitude of the lowest resolved one.
    let scale: Vec<f64> = (0..n_half)
        .map(|k| (k.max(1) as f64 / nf).powf(-beta / 2.0))
        .collect();

    let mut w: Vec<f64> = scale[1..].to_vec();
    if let Some(last) = w.last_mut() {
        *last *= (1 + n % 2) as f64 / 2.0;
    }
    let sigma = 2.0 * w.iter().map(|v| v * v).sum::<f64>().sqrt() / nf;

    let mut draw = |s: &f64| {
        let z: f64 = StandardNormal.sample(rng);
        s * z
    };
    let mut re: Vec<f64> = scale.iter().map(&mut draw).collect();
    let mut im: Vec<f64> = scale.iter().map(&mut draw).collect();
    if n % 2 == 0 {
        im[n_half - 1] = 0.0;
        re[n_half - 1] *= SQRT_2;
    }
    im[0] = 0.0;
    re[0] *= SQRT_2;

    let mut spectrum: Vec<Complex64> = (0..n)
        .map(|k| {
            if k < n_half {
                Complex64::new(re[k], im[k])
            } else {
                Complex64::new(re[n - k], -im[n - k])
            }
        })
        .collect();
    FftPlanner::new().plan_fft_inverse(n).process(&mut spectrum);

    spectrum.iter().map(|c| c.re / nf / sigma).collect()
}

/// Removes `floor(len * fraction)` randomly chosen elements, keeping order.
///
/// The same `seed` removes the same positions from any slice of the same
/// length, so parallel columns stay aligned.
pub fn remove_fraction_with_seed<T: Clone>(values: &[T], fraction: f64, seed: u64) -> Vec<T> {
    let n_remove = ((values.len() as f64) * fraction.clamp(0.0, 1.0)).floor() as usize;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut keep = vec![true; values.len()];
    for i in index::sample(&mut rng, values.len(), n_remove.min(values.len())).iter() {
        keep[i] = false;
    }
    values
        .iter()
        .zip(keep)
        .filter_map(|(v, k)| k.then(|| v.clone()))
        .collect()
}

/// Parameters of a mock light curve.
///
/// Timestamps are uniform random over the interval, shifted to start at
/// zero. Magnitudes are `magnitude + A sin(2π t / period) + noise`, where
/// the noise is standardised power-law noise and `A` is `amplitude` times
/// the largest noise value.
///
/// ```ignore
/// use qhx_detect::{MockLightCurve, TimeUnit};
///
/// let lc = MockLightCurve::new()
///     .with_time_interval(10.0, TimeUnit::Year)
///     .with_period(100.0)
///     .generate(&mut rng)?;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct MockLightCurve {
    time_interval: f64,
    time_unit: TimeUnit,
    num_points: usize,
    period: f64,
    amplitude: f64,
    remove_fraction: f64,
    magnitude: f64,
    noise_exponent: f64,
}

impl Default for MockLightCurve {
    fn default() -> Self {
        Self {
            time_interval: 10.0,
            time_unit: TimeUnit::Year,
            num_points: 1000,
            period: 100.0,
            amplitude: 0.3,
            remove_fraction: 0.5,
            magnitude: 22.0,
            noise_exponent: DEFAULT_NOISE_EXPONENT,
        }
    }
}

impl MockLightCurve {
    /// Ten years, 1000 points, 100-day period, amplitude 0.3, half the points removed.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_interval(mut self, interval: f64, unit: TimeUnit) -> Self {
        self.time_interval = interval;
        self.time_unit = unit;
        self
    }

    /// Number of points before removal.
    pub fn with_num_points(mut self, num_points: usize) -> Self {
        self.num_points = num_points;
        self
    }

    /// Injected period in days.
    pub fn with_period(mut self, period: f64) -> Self {
        self.period = period;
        self
    }

    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Fraction of points removed, in `[0, 1)`.
    pub fn with_remove_fraction(mut self, fraction: f64) -> Self {
        self.remove_fraction = fraction;
        self
    }

    /// Mean magnitude.
    pub fn with_magnitude(mut self, magnitude: f64) -> Self {
        self.magnitude = magnitude;
        self
    }

    /// Spectral exponent of the noise.
    pub fn with_noise_exponent(mut self, beta: f64) -> Self {
        self.noise_exponent = beta;
        self
    }

    /// Span of the light curve in days.
    pub fn span_days(&self) -> f64 {
        self.time_interval * self.time_unit.days()
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn remove_fraction(&self) -> f64 {
        self.remove_fraction
    }

    fn validate(&self) -> Result<(), DetectError> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(DetectError::InvalidConfig(format!(
                    "{name} must be positive and finite, got {v}"
                )))
            }
        };
        positive("time_interval", self.time_interval)?;
        positive("period", self.period)?;
        if self.num_points < 2 {
            return Err(DetectError::InvalidConfig(format!(
                "num_points must be at least 2, got {}",
                self.num_points
            )));
        }
        if !(0.0..1.0).contains(&self.remove_fraction) {
            return Err(DetectError::InvalidConfig(format!(
                "remove_fraction must be in [0, 1), got {}",
                self.remove_fraction
            )));
        }
        if !self.amplitude.is_finite() || !self.magnitude.is_finite() || !self.noise_exponent.is_finite() {
            return Err(DetectError::InvalidConfig(
                "amplitude, magnitude and noise exponent must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Draws one light curve.
    ///
    /// # Errors
    ///
    /// [`DetectError::InvalidConfig`] for out-of-range parameters.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<LightCurve, DetectError> {
        self.validate()?;
        let n = self.num_points;

        let noise: Vec<f64> = powerlaw_psd_gaussian(self.noise_exponent, n, rng)
            .into_iter()
            .map(|v| v + 1.0)
            .collect();
        let mean = qhx_stats::mean(&noise);
        let std = qhx_stats::std_population(&noise);
        let noise: Vec<f64> = if std > 0.0 {
            noise.iter().map(|v| (v - mean) / std).collect()
        } else {
            vec![0.0; n]
        };
        let peak = noise.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let span = self.span_days();
        let mut time: Vec<f64> = (0..n).map(|_| rng.random_range(0.0..span)).collect();
        time.sort_by(f64::total_cmp);
        let t0 = time[0];
        time.iter_mut().for_each(|t| *t -= t0);

        let magnitude: Vec<f64> = time
            .iter()
            .zip(&noise)
            .map(|(t, x)| {
                self.magnitude + self.amplitude * peak * (2.0 * PI * t / self.period).sin() + x
            })
            .collect();

        let seed: u64 = rng.random();
        let time = remove_fraction_with_seed(&time, self.remove_fraction, seed);
        let magnitude = remove_fraction_with_seed(&magnitude, self.remove_fraction, seed);
        LightCurve::new(time, magnitude, None)
    }
}

/// Mock light curve over `time_interval` years.
///
/// # Errors
///
/// [`DetectError::InvalidConfig`] for out-of-range parameters.
pub fn simple_mock_lc<R: Rng + ?Sized>(
    time_interval: f64,
    num_points: usize,
    period: f64,
    amplitude: f64,
    remove_fraction: f64,
    magnitude: f64,
    rng: &mut R,
) -> Result<LightCurve, DetectError> {
    MockLightCurve::new()
        .with_time_interval(time_interval, TimeUnit::Year)
        .with_num_points(num_points)
        .with_period(period)
        .with_amplitude(amplitude)
        .with_remove_fraction(remove_fraction)
        .with_magnitude(magnitude)
        .generate(rng)
}

/// Mean magnitude the damped random walk relaxes to.
pub const DRW_MEAN_MAGNITUDE: f64 = 23.0;

/// Bolometric constant of the black-hole mass estimate.
const MASS_CONST_LUMINOSITY: f64 = 0.455 * 1.25e38;
/// Light days to astronomical units.
const LIGHT_DAY_AU: f64 = 173.145;
/// Orbit radius of the physical oscillation (light days).
const ORBIT_LIGHT_DAYS: f64 = 10.0;
/// Photometric error model: systematic floor, `gamma` and 5-sigma depth.
const ERR_SYS: f64 = 0.005;
const ERR_GAMMA: f64 = 0.039;
const ERR_M5: f64 = 24.7;

/// Frame the damping time scale and amplitude are expressed in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Frame {
    #[default]
    Observed,
    Rest,
}

/// Period of the oscillation added to a [`DrwMock`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OscillationPeriod {
    /// Fixed period in days.
    Days(f64),
    /// Orbit of 10 light days around the drawn black-hole mass.
    Physical,
}

impl Default for OscillationPeriod {
    /// 0.001 years.
    fn default() -> Self {
        OscillationPeriod::Days(0.001 * 365.25)
    }
}

/// Damped-random-walk light curve on a regular cadence.
///
/// Each draw picks a bolometric luminosity uniformly in
/// `log10 L = [42.2, 49)`, derives the damping time scale and the
/// variability amplitude from it, and walks from [`DRW_MEAN_MAGNITUDE`].
/// Every magnitude then gets a photometric error term, Gaussian noise
/// proportional to its value and, optionally, a sinusoid.
#[derive(Clone, Debug, PartialEq)]
pub struct DrwMock {
    span: f64,
    cadence: f64,
    oscillation: Option<(f64, OscillationPeriod)>,
    noise: f64,
    redshift: f64,
    frame: Frame,
}

impl Default for DrwMock {
    fn default() -> Self {
        Self {
            span: 3650.0,
            cadence: 1.0,
            oscillation: Some((0.14, OscillationPeriod::default())),
            noise: 0.00005,
            redshift: 0.0,
            frame: Frame::Observed,
        }
    }
}

/// One draw of a [`DrwMock`].
#[derive(Clone, Debug, PartialEq)]
pub struct DrwLightCurve {
    pub curve: LightCurve,
    /// Oscillation period in days, when one was added.
    pub period: Option<f64>,
    /// Damping time scale (days).
    pub tau: f64,
    /// Variability amplitude.
    pub sigma: f64,
    pub log_luminosity: f64,
}

impl DrwMock {
    /// Daily cadence over `span_days` with a 0.14 mag oscillation.
    pub fn new(span_days: f64) -> Self {
        Self {
            span: span_days,
            ..Self::default()
        }
    }

    /// Days between samples.
    pub fn with_cadence(mut self, cadence: f64) -> Self {
        self.cadence = cadence;
        self
    }

    /// Adds `amplitude * sin(2π t / P)`; `None` leaves the walk alone.
    pub fn with_oscillation(mut self, oscillation: Option<(f64, OscillationPeriod)>) -> Self {
        self.oscillation = oscillation;
        self
    }

    /// Relative noise level.
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_redshift(mut self, z: f64, frame: Frame) -> Self {
        self.redshift = z;
        self.frame = frame;
        self
    }

    fn validate(&self) -> Result<(), DetectError> {
        if !(self.span.is_finite() && self.cadence.is_finite() && self.cadence > 0.0)
            || self.span < 2.0 * self.cadence
        {
            return Err(DetectError::InvalidConfig(format!(
                "need a positive cadence and at least two samples, got span {} and cadence {}",
                self.span, self.cadence
            )));
        }
        if !(self.noise.is_finite() && self.noise >= 0.0) {
            return Err(DetectError::InvalidConfig(format!(
                "noise must be finite and >= 0, got {}",
                self.noise
            )));
        }
        if !(self.redshift.is_finite() && self.redshift >= 0.0) {
            return Err(DetectError::InvalidConfig(format!(
                "redshift must be finite and >= 0, got {}",
                self.redshift
            )));
        }
        match self.oscillation {
            Some((amplitude, _)) if !amplitude.is_finite() => Err(DetectError::InvalidConfig(
                format!("oscillation amplitude must be finite, got {amplitude}"),
            )),
            Some((_, OscillationPeriod::Days(p))) if !(p.is_finite() && p > 0.0) => Err(
                DetectError::InvalidConfig(format!("oscillation period must be positive, got {p}")),
            ),
            _ => Ok(()),
        }
    }

    /// Draws one light curve.
    ///
    /// # Errors
    ///
    /// [`DetectError::InvalidConfig`] for out-of-range parameters.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<DrwLightCurve, DetectError> {
        self.validate()?;
        let n = (self.span / self.cadence).ceil() as usize;
        let time: Vec<f64> = (0..n).map(|i| i as f64 * self.cadence).collect();

        let log_luminosity = rng.random_range(42.2..49.0);
        let log_z = (1.0 + self.redshift).log10();
        let log_tau = -8.13 + 0.24 * log_luminosity + 0.34 * log_z;
        let log_sig2 = 8.0 - 0.27 * log_luminosity + 0.47 * log_z;
        let (tau, sigma) = match self.frame {
            Frame::Observed => (
                10f64.powf(log_tau) * (1.0 + self.redshift),
                10f64.powf(log_sig2).sqrt() / (1.0 + self.redshift).sqrt(),
            ),
            Frame::Rest => (10f64.powf(log_tau), 10f64.powf(log_sig2).sqrt()),
        };

        let decay = (-self.cadence / tau).exp();
        let step_std = (10.0 * 0.5 * tau * sigma * sigma * (1.0 - decay * decay)).sqrt();
        let step = Normal::new(0.0, step_std)
            .map_err(|e| DetectError::InvalidConfig(format!("random walk step: {e}")))?;
        let mut walk = Vec::with_capacity(n);
        walk.push(DRW_MEAN_MAGNITUDE);
        for i in 1..n {
            let mean = walk[i - 1] * decay + DRW_MEAN_MAGNITUDE * (1.0 - decay);
            walk.push(mean + step.sample(rng));
        }

        let period = self.oscillation.map(|(amplitude, period)| {
            let days = match period {
                OscillationPeriod::Days(p) => p,
                OscillationPeriod::Physical => {
                    let luminosity = 10f64.powf(log_luminosity);
                    let mass = (luminosity * 1e9f64.sqrt() / MASS_CONST_LUMINOSITY).powf(2.0 / 3.0);
                    ((ORBIT_LIGHT_DAYS * LIGHT_DAY_AU).powi(3) / mass).sqrt() * 365.25
                }
            };
            for (m, t) in walk.iter_mut().zip(&time) {
                *m += amplitude * (2.0 * PI * t / days).sin();
            }
            days
        });

        let magnitude: Vec<f64> = walk
            .iter()
            .map(|&m| {
                let x = 10f64.powf(0.4 * (m - ERR_M5));
                let err = ERR_SYS * ERR_SYS + (0.04 - ERR_GAMMA) * x + ERR_GAMMA * x * x;
                let z: f64 = StandardNormal.sample(rng);
                m + self.noise * m.abs() * z + err.sqrt()
            })
            .collect();

        Ok(DrwLightCurve {
            curve: LightCurve::new(time, magnitude, None)?,
            period,
            tau,
            sigma,
            log_luminosity,
        })
    }
}

/// Samples a continuous reference curve at survey epochs.
///
/// Epoch `mjd[i]` becomes day `ceil(mjd[i] - min(mjd))` of the survey and
/// takes the magnitude of the first reference point less than a day from
/// it. Epochs without such a point are dropped; kept epochs keep their
/// exact offset `mjd[i] - min(mjd)` as time.
///
/// # Errors
///
/// [`DetectError::LengthMismatch`] when the reference columns differ in length.
pub fn artificial_lc_sampled(
    mjd: &[f64],
    reference_time: &[f64],
    reference_magnitude: &[f64],
) -> Result<LightCurve, DetectError> {
    if reference_time.len() != reference_magnitude.len() {
        return Err(DetectError::LengthMismatch {
            time: reference_time.len(),
            magnitude: reference_magnitude.len(),
            errors: 0,
        });
    }
    let start = mjd
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::INFINITY, f64::min);
    let (time, magnitude): (Vec<f64>, Vec<f64>) = mjd
        .iter()
        .filter(|v| v.is_finite())
        .filter_map(|&m| {
            let offset = m - start;
            let day = offset.ceil();
            reference_time
                .iter()
                .position(|t| (t - day).abs() < 1.0)
                .map(|i| (offset, reference_magnitude[i]))
        })
        .unzip();
    LightCurve::new(time, magnitude, None)
}
