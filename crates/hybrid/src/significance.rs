//! Shuffle significance of a detected peak.
//!
//! Each trial destroys the time ordering of the magnitudes, reruns the full
//! WWZ, correlation and profile chain on the same grid, and compares the
//! observed profile value at the peak with the shuffled one. Trials are
//! independent and run in parallel; each draws from its own generator seeded
//! from the caller's, so the counts do not depend on scheduling.

use qhx_wwz::{FrequencyGrid, WwzConfig, wwz_on_grid};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::correlation::correlation_nd;
use crate::error::HybridError;
use crate::periods::interpolated_profile;

/// Monte Carlo settings.
#[derive(Clone, Debug, PartialEq)]
pub struct SignificanceConfig {
    num_trials: usize,
    use_mag_errors: bool,
}

impl Default for SignificanceConfig {
    fn default() -> Self {
        Self {
            num_trials: 50,
            use_mag_errors: false,
        }
    }
}

impl SignificanceConfig {
    /// Creates a configuration with `num_trials` plain shuffles.
    pub fn new(num_trials: usize) -> Self {
        Self {
            num_trials,
            ..Self::default()
        }
    }

    /// Perturbs every shuffled magnitude with its own Gaussian error.
    pub fn with_mag_errors(mut self, use_mag_errors: bool) -> Self {
        self.use_mag_errors = use_mag_errors;
        self
    }

    /// Sets the number of trials.
    pub fn with_num_trials(mut self, num_trials: usize) -> Self {
        self.num_trials = num_trials;
        self
    }

    /// Returns the number of trials.
    pub fn num_trials(&self) -> usize {
        self.num_trials
    }

    /// Returns whether magnitude errors perturb the shuffles.
    pub fn use_mag_errors(&self) -> bool {
        self.use_mag_errors
    }
}

/// Outcome of a significance run.
///
/// Both fractions divide by the configured trial count, so skipped and
/// failed trials lower them without being counted either way.
#[derive(Clone, Debug, PartialEq)]
pub struct SignificanceResult {
    /// Observed profile value per counted trial; NaN for failed trials.
    pub observed: Vec<f64>,
    /// Shuffled profile value for every trial the shuffle won.
    pub shuffled: Vec<f64>,
    /// Fraction of trials where the observation beat the shuffle.
    pub peak_wins: f64,
    /// Fraction of trials where the shuffle matched or beat the observation.
    pub noise_wins: f64,
    /// Trials whose peak index fell outside the shuffled profile.
    pub skipped: usize,
    /// Trials that failed numerically.
    pub failed: usize,
    /// Configured trial count.
    pub num_trials: usize,
}

impl SignificanceResult {
    /// `1 - noise_wins`.
    pub fn significance(&self) -> f64 {
        1.0 - self.noise_wins
    }
}

enum Trial {
    PeakWins { observed: f64 },
    NoiseWins { observed: f64, shuffled: f64 },
    OutOfRange,
    Failed,
}

/// Significance of peak number `peak` of `peaks` against shuffled data.
///
/// `profile` is the observed fine-grid profile returned by
/// [`periods`](crate::periods::periods), and `time`/`magnitude` the light
/// curve it came from. `errors` are required when the configuration asks for
/// error-perturbed shuffles.
///
/// # Errors
///
/// Only static problems fail the run: bad period bounds, an unknown peak,
/// a profile that does not match the grid, a zero trial count, or missing
/// or mis-sized magnitude errors. Numerical failures inside a trial are
/// logged and counted in [`SignificanceResult::failed`].
#[allow(clippy::too_many_arguments)]
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(peak = peak, num_trials = config.num_trials)
)]
pub fn signif_johnson<R: Rng + ?Sized>(
    peak: usize,
    peaks: &[usize],
    profile: &[f64],
    time: &[f64],
    magnitude: &[f64],
    errors: Option<&[f64]>,
    wwz: &WwzConfig,
    config: &SignificanceConfig,
    rng: &mut R,
) -> Result<SignificanceResult, HybridError> {
    let grid = wwz.grid()?;
    let index = *peaks.get(peak).ok_or(HybridError::InvalidPeakIndex {
        index: peak,
        len: peaks.len(),
    })?;
    let fine_len = 2 * grid.n_freq();
    if profile.len() != fine_len {
        return Err(HybridError::GridMismatch {
            len: profile.len(),
            expected: fine_len,
        });
    }
    if config.num_trials == 0 {
        return Err(HybridError::InvalidConfig(
            "num_trials must be > 0".to_string(),
        ));
    }
    let errors = if config.use_mag_errors {
        let errors = errors.ok_or(HybridError::MissingMagnitudeErrors)?;
        if errors.len() != magnitude.len() {
            return Err(HybridError::ErrorLengthMismatch {
                magnitudes: magnitude.len(),
                errors: errors.len(),
            });
        }
        Some(errors)
    } else {
        None
    };

    let seeds: Vec<u64> = (0..config.num_trials).map(|_| rng.next_u64()).collect();
    let trial = TrialSetup {
        index,
        observed: profile.get(index).copied(),
        time,
        magnitude,
        errors,
        grid: &grid,
        ntau: wwz.ntau(),
        decay_constant: wwz.decay_constant(),
    };
    let outcomes: Vec<Trial> = seeds
        .par_iter()
        .enumerate()
        .map(|(i, &seed)| trial.run(i, seed))
        .collect();

    let mut result = SignificanceResult {
        observed: Vec::new(),
        shuffled: Vec::new(),
        peak_wins: 0.0,
        noise_wins: 0.0,
        skipped: 0,
        failed: 0,
        num_trials: config.num_trials,
    };
    let (mut count, mut count11) = (0usize, 0usize);
    for outcome in outcomes {
        match outcome {
            Trial::PeakWins { observed } => {
                count += 1;
                result.observed.push(observed);
            }
            Trial::NoiseWins { observed, shuffled } => {
                count11 += 1;
                result.observed.push(observed);
                result.shuffled.push(shuffled);
            }
            Trial::OutOfRange => result.skipped += 1,
            Trial::Failed => {
                result.failed += 1;
                result.observed.push(f64::NAN);
            }
        }
    }
    let n = config.num_trials as f64;
    result.peak_wins = count as f64 / n;
    result.noise_wins = count11 as f64 / n;
    debug!(
        peak_wins = result.peak_wins,
        noise_wins = result.noise_wins,
        skipped = result.skipped,
        failed = result.failed,
        "significance done"
    );
    Ok(result)
}

/// Everything a trial reads; shared by reference across threads.
struct TrialSetup<'a> {
    index: usize,
    observed: Option<f64>,
    time: &'a [f64],
    magnitude: &'a [f64],
    errors: Option<&'a [f64]>,
    grid: &'a FrequencyGrid,
    ntau: usize,
    decay_constant: f64,
}

impl TrialSetup<'_> {
    fn run(&self, trial: usize, seed: u64) -> Trial {
        let mut rng = StdRng::seed_from_u64(seed);
        let shuffled = match self.surrogate(&mut rng) {
            Ok(y) => y,
            Err(msg) => {
                warn!(trial, "significance trial failed: {msg}");
                return Trial::Failed;
            }
        };
        let profile = match self.profile(&shuffled) {
            Ok(p) => p,
            Err(e) => {
                warn!(trial, error = %e, "significance trial failed");
                return Trial::Failed;
            }
        };

        let (Some(observed), Some(&value)) = (self.observed, profile.get(self.index)) else {
            warn!(
                trial,
                index = self.index,
                len = profile.len(),
                "peak index out of range, trial skipped"
            );
            return Trial::OutOfRange;
        };
        if observed / value > 1.0 {
            Trial::PeakWins { observed }
        } else {
            Trial::NoiseWins {
                observed,
                shuffled: value,
            }
        }
    }

    /// Shuffled magnitudes, optionally resampled within their errors.
    fn surrogate(&self, rng: &mut StdRng) -> Result<Vec<f64>, String> {
        match self.errors {
            None => {
                let mut y = self.magnitude.to_vec();
                y.shuffle(rng);
                Ok(y)
            }
            Some(errors) => {
                let mut order: Vec<usize> = (0..self.magnitude.len()).collect();
                order.shuffle(rng);
                order
                    .into_iter()
                    .map(|i| {
                        let noise = Normal::new(0.0, errors[i])
                            .map_err(|e| format!("magnitude error {}: {e}", errors[i]))?;
                        Ok(self.magnitude[i] + noise.sample(rng))
                    })
                    .collect()
            }
        }
    }

    fn profile(&self, magnitude: &[f64]) -> Result<Vec<f64>, HybridError> {
        let result = wwz_on_grid(
            self.time,
            magnitude,
            self.grid,
            self.ntau,
            self.decay_constant,
        )?;
        let corr = correlation_nd(result.power(), result.power())?;
        interpolated_profile(&corr, self.grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hybrid::hybrid2d;
    use crate::periods::{PeakConfig, periods};
    use std::f64::consts::PI;

    fn sine_curve() -> (Vec<f64>, Vec<f64>) {
        let t: Vec<f64> = (0..200).map(|i| i as f64 * 5.0 + (i % 3) as f64).collect();
        let y: Vec<f64> = t
            .iter()
            .enumerate()
            .map(|(i, &ti)| {
                let jitter = 0.03 * ((i * 7919) % 101) as f64 / 101.0;
                0.3 * (2.0 * PI * ti / 50.0).sin() + jitter
            })
            .collect();
        (t, y)
    }

    fn config() -> WwzConfig {
        WwzConfig::new(15, 40).with_period_bounds(200.0, 10.0)
    }

    fn detect(t: &[f64], y: &[f64]) -> (Vec<usize>, Vec<f64>) {
        let h = hybrid2d(t, y, &config()).unwrap();
        let grid = config().grid().unwrap();
        let det = periods(h.correlation(), &grid, &PeakConfig::default()).unwrap();
        (det.indices(), det.profile)
    }

    #[test]
    fn strong_signal_beats_shuffles() {
        let (t, y) = sine_curve();
        let (peaks, profile) = detect(&t, &y);
        assert!(!peaks.is_empty());
        let mut rng = StdRng::seed_from_u64(7);
        let res = signif_johnson(
            0,
            &peaks,
            &profile,
            &t,
            &y,
            None,
            &config(),
            &SignificanceConfig::new(10),
            &mut rng,
        )
        .unwrap();
        assert_eq!(res.skipped, 0);
        assert_eq!(res.observed.len() + res.skipped, 10);
        let total = res.peak_wins + res.noise_wins + res.failed as f64 / 10.0;
        assert!((total - 1.0).abs() < 1e-12);
        assert!(res.significance() >= 0.5, "significance {}", res.significance());
        assert!((0.0..=1.0).contains(&res.significance()));
    }

    #[test]
    fn same_seed_same_counts() {
        let (t, y) = sine_curve();
        let (peaks, profile) = detect(&t, &y);
        let errs = vec![0.05; y.len()];
        let cfg = SignificanceConfig::new(6).with_mag_errors(true);
        let run = |seed| {
            signif_johnson(
                0,
                &peaks,
                &profile,
                &t,
                &y,
                Some(&errs),
                &config(),
                &cfg,
                &mut StdRng::seed_from_u64(seed),
            )
            .unwrap()
        };
        let (a, b) = (run(11), run(11));
        assert_eq!(a.peak_wins, b.peak_wins);
        assert_eq!(a.noise_wins, b.noise_wins);
        assert_eq!(a.shuffled, b.shuffled);
    }

    #[test]
    fn out_of_range_trials_keep_full_denominator() {
        let (t, y) = sine_curve();
        let grid = config().grid().unwrap();
        let profile = vec![0.5; 2 * grid.n_freq()];
        let res = signif_johnson(
            0,
            &[10_000],
            &profile,
            &t,
            &y,
            None,
            &config(),
            &SignificanceConfig::new(3),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();
        assert_eq!(res.skipped, 3);
        assert!(res.observed.is_empty());
        assert_eq!(res.peak_wins, 0.0);
        assert_eq!(res.noise_wins, 0.0);
        assert_eq!(res.significance(), 1.0);
    }

    #[test]
    fn static_errors() {
        let (t, y) = sine_curve();
        let grid = config().grid().unwrap();
        let profile = vec![0.0; 2 * grid.n_freq()];
        let mut rng = StdRng::seed_from_u64(0);
        let cfg = SignificanceConfig::new(2);

        let err = signif_johnson(3, &[1], &profile, &t, &y, None, &config(), &cfg, &mut rng);
        assert!(matches!(err, Err(HybridError::InvalidPeakIndex { index: 3, len: 1 })));

        let with_errs = cfg.clone().with_mag_errors(true);
        let err = signif_johnson(0, &[1], &profile, &t, &y, None, &config(), &with_errs, &mut rng);
        assert!(matches!(err, Err(HybridError::MissingMagnitudeErrors)));

        let short = vec![0.1; 3];
        let err = signif_johnson(
            0,
            &[1],
            &profile,
            &t,
            &y,
            Some(&short),
            &config(),
            &with_errs,
            &mut rng,
        );
        assert!(matches!(err, Err(HybridError::ErrorLengthMismatch { .. })));

        let unbounded = WwzConfig::new(15, 40);
        let err = signif_johnson(0, &[1], &profile, &t, &y, None, &unbounded, &cfg, &mut rng);
        assert!(matches!(err, Err(HybridError::Wwz(_))));

        let err = signif_johnson(0, &[1], &profile[..5], &t, &y, None, &config(), &cfg, &mut rng);
        assert!(matches!(err, Err(HybridError::GridMismatch { .. })));
    }

    #[test]
    fn negative_error_fails_trial_without_aborting() {
        let (t, y) = sine_curve();
        let grid = config().grid().unwrap();
        let profile = vec![0.5; 2 * grid.n_freq()];
        let errs = vec![-1.0; y.len()];
        let res = signif_johnson(
            0,
            &[4],
            &profile,
            &t,
            &y,
            Some(&errs),
            &config(),
            &SignificanceConfig::new(2).with_mag_errors(true),
            &mut StdRng::seed_from_u64(3),
        )
        .unwrap();
        assert_eq!(res.failed, 2);
        assert!(res.observed.iter().all(|v| v.is_nan()));
        assert_eq!(res.significance(), 1.0);
    }
}
