//! Matching of periods detected independently in two bands.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use qhx_wwz::WwzConfig;
use rand::Rng;
use tracing::{debug, warn};

use crate::error::HybridError;
use crate::periods::PeriodDetection;
use crate::significance::{SignificanceConfig, signif_johnson};

/// Absolute slack added to the relative tolerance.
const ABS_TOLERANCE: f64 = 1e-8;

/// How periods of band A are paired with periods of band B.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Each A period takes the closest unused B period within tolerance.
    #[default]
    Nearest,
    /// Position-wise comparison after cycling the shorter list to the
    /// length of the longer one.
    IndexAligned,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStrategy::Nearest => f.write_str("nearest"),
            MatchStrategy::IndexAligned => f.write_str("index-aligned"),
        }
    }
}

impl FromStr for MatchStrategy {
    type Err = HybridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" => Ok(MatchStrategy::Nearest),
            "index-aligned" | "index_aligned" | "indexaligned" => Ok(MatchStrategy::IndexAligned),
            other => Err(HybridError::InvalidConfig(format!(
                "unknown match strategy '{other}'"
            ))),
        }
    }
}

/// Settings for cross-band matching.
#[derive(Clone, Debug, PartialEq)]
pub struct ReconcileConfig {
    relative_tolerance: f64,
    strategy: MatchStrategy,
    significance: SignificanceConfig,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            relative_tolerance: 0.1,
            strategy: MatchStrategy::default(),
            significance: SignificanceConfig::default(),
        }
    }
}

impl ReconcileConfig {
    /// Creates the default configuration: 10% tolerance, nearest matching.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the relative tolerance.
    pub fn with_relative_tolerance(mut self, rtol: f64) -> Self {
        self.relative_tolerance = rtol;
        self
    }

    /// Sets the match strategy.
    pub fn with_strategy(mut self, strategy: MatchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the significance settings used for every match.
    pub fn with_significance(mut self, significance: SignificanceConfig) -> Self {
        self.significance = significance;
        self
    }

    /// Returns the relative tolerance.
    pub fn relative_tolerance(&self) -> f64 {
        self.relative_tolerance
    }

    /// Returns the match strategy.
    pub fn strategy(&self) -> MatchStrategy {
        self.strategy
    }

    /// Returns the significance settings.
    pub fn significance(&self) -> &SignificanceConfig {
        &self.significance
    }
}

/// One band's light curve and its detected periods.
#[derive(Clone, Copy, Debug)]
pub struct BandInput<'a> {
    /// Observation times.
    pub time: &'a [f64],
    /// Magnitudes.
    pub magnitude: &'a [f64],
    /// Magnitude errors, needed only for error-perturbed significance.
    pub errors: Option<&'a [f64]>,
    /// Peaks and profile from [`periods`](crate::periods::periods).
    pub detection: &'a PeriodDetection,
}

/// A period found in both bands.
#[derive(Clone, Debug, PartialEq)]
pub struct CommonPeriod {
    /// Reported period (days).
    pub period: f64,
    /// Upper error, possibly the degenerate marker.
    pub upper_error: f64,
    /// Lower error, possibly the degenerate marker.
    pub lower_error: f64,
    /// `1 - noise_wins` of the shuffle test, NaN if it failed.
    pub significance: f64,
}

/// `|a - b| <= 1e-8 + rtol * |b|`.
pub fn is_close(a: f64, b: f64, rtol: f64) -> bool {
    (a - b).abs() <= ABS_TOLERANCE + rtol * b.abs()
}

/// Periods common to bands `a` and `b`, each with its shuffle significance.
///
/// An empty result means no agreement and is not an error.
///
/// # Errors
///
/// Fails only on invalid period bounds in `wwz`. A significance run that
/// fails for one match reports NaN for that match.
pub fn same_periods<R: Rng + ?Sized>(
    a: &BandInput<'_>,
    b: &BandInput<'_>,
    wwz: &WwzConfig,
    config: &ReconcileConfig,
    rng: &mut R,
) -> Result<Vec<CommonPeriod>, HybridError> {
    wwz.grid()?;
    let common = match config.strategy {
        MatchStrategy::Nearest => nearest(a, b, wwz, config, rng),
        MatchStrategy::IndexAligned => index_aligned(a, b, wwz, config, rng),
    };
    debug!(
        strategy = %config.strategy,
        n_a = a.detection.peaks.len(),
        n_b = b.detection.peaks.len(),
        n_common = common.len(),
        "bands reconciled"
    );
    Ok(common)
}

fn nearest<R: Rng + ?Sized>(
    a: &BandInput<'_>,
    b: &BandInput<'_>,
    wwz: &WwzConfig,
    config: &ReconcileConfig,
    rng: &mut R,
) -> Vec<CommonPeriod> {
    let mut used = vec![false; b.detection.peaks.len()];
    let mut common = Vec::new();
    for (i, pa) in a.detection.peaks.iter().enumerate() {
        let best = b
            .detection
            .peaks
            .iter()
            .enumerate()
            .filter(|(j, pb)| !used[*j] && is_close(pa.period, pb.period, config.relative_tolerance))
            .min_by(|(_, x), (_, y)| {
                let dx = (pa.period - x.period).abs();
                let dy = (pa.period - y.period).abs();
                dx.partial_cmp(&dy).unwrap_or(Ordering::Equal)
            })
            .map(|(j, _)| j);
        let Some(j) = best else { continue };
        used[j] = true;
        common.push(CommonPeriod {
            period: pa.period,
            upper_error: pa.upper_error,
            lower_error: pa.lower_error,
            significance: significance(a, i, wwz, &config.significance, rng),
        });
    }
    common
}

fn index_aligned<R: Rng + ?Sized>(
    a: &BandInput<'_>,
    b: &BandInput<'_>,
    wwz: &WwzConfig,
    config: &ReconcileConfig,
    rng: &mut R,
) -> Vec<CommonPeriod> {
    let pa: Vec<f64> = a.detection.periods();
    let pb: Vec<f64> = b.detection.periods();
    // The shorter list is cycled; errors and significance come from the
    // band whose list keeps its length.
    let (lhs, rhs, source) = match pa.len().cmp(&pb.len()) {
        Ordering::Equal => (pa, pb, a),
        Ordering::Less => (cycled(&pa, pb.len()), pb, b),
        Ordering::Greater => (cycled(&pb, pa.len()), pa, a),
    };

    let mut common = Vec::new();
    for (i, (&x, &y)) in lhs.iter().zip(&rhs).enumerate() {
        if !is_close(x, y, config.relative_tolerance) {
            continue;
        }
        let peak = &source.detection.peaks[i];
        common.push(CommonPeriod {
            period: x,
            upper_error: peak.upper_error,
            lower_error: peak.lower_error,
            significance: significance(source, i, wwz, &config.significance, rng),
        });
    }
    common
}

/// `values` repeated cyclically (or truncated) to `len` entries.
fn cycled(values: &[f64], len: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    values.iter().copied().cycle().take(len).collect()
}

fn significance<R: Rng + ?Sized>(
    band: &BandInput<'_>,
    peak: usize,
    wwz: &WwzConfig,
    config: &SignificanceConfig,
    rng: &mut R,
) -> f64 {
    match signif_johnson(
        peak,
        &band.detection.indices(),
        &band.detection.profile,
        band.time,
        band.magnitude,
        band.errors,
        wwz,
        config,
        rng,
    ) {
        Ok(result) => result.significance(),
        Err(e) => {
            warn!(peak, error = %e, "significance failed");
            f64::NAN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periods::Peak;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn detection(periods: &[f64]) -> PeriodDetection {
        PeriodDetection {
            peaks: periods
                .iter()
                .enumerate()
                .map(|(i, &p)| Peak {
                    index: i,
                    frequency: 1.0 / p,
                    period: p,
                    upper_error: 0.1 * p,
                    lower_error: 0.05 * p,
                })
                .collect(),
            profile: Vec::new(),
            frequencies: Vec::new(),
        }
    }

    fn band(det: &PeriodDetection) -> BandInput<'_> {
        BandInput {
            time: &[],
            magnitude: &[],
            errors: None,
            detection: det,
        }
    }

    fn wwz() -> WwzConfig {
        WwzConfig::new(10, 20).with_period_bounds(500.0, 10.0)
    }

    #[test]
    fn is_close_is_relative_to_second_argument() {
        assert!(is_close(109.0, 100.0, 0.1));
        assert!(is_close(110.0, 100.0, 0.1));
        assert!(!is_close(111.0, 100.0, 0.1));
        assert!(is_close(0.0, 0.0, 0.1));
    }

    #[test]
    fn strategy_parses_and_displays() {
        assert_eq!("nearest".parse::<MatchStrategy>().unwrap(), MatchStrategy::Nearest);
        assert_eq!(
            "Index_Aligned".parse::<MatchStrategy>().unwrap(),
            MatchStrategy::IndexAligned
        );
        assert!("fuzzy".parse::<MatchStrategy>().is_err());
        assert_eq!(MatchStrategy::IndexAligned.to_string(), "index-aligned");
        assert_eq!(MatchStrategy::default(), MatchStrategy::Nearest);
    }

    #[test]
    fn nearest_matches_out_of_order_lists() {
        let a = detection(&[50.0, 100.0, 300.0]);
        let b = detection(&[98.0, 52.0]);
        // significance fails on empty series and is reported as NaN
        let common = same_periods(
            &band(&a),
            &band(&b),
            &wwz(),
            &ReconcileConfig::default(),
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();
        let found: Vec<f64> = common.iter().map(|c| c.period).collect();
        assert_eq!(found, vec![50.0, 100.0]);
        assert_eq!(common[1].upper_error, 10.0);
        assert_eq!(common[1].lower_error, 5.0);
        assert!(common.iter().all(|c| c.significance.is_nan()));
    }

    #[test]
    fn nearest_uses_each_b_period_once() {
        let a = detection(&[100.0, 101.0]);
        let b = detection(&[100.5]);
        let common = same_periods(
            &band(&a),
            &band(&b),
            &wwz(),
            &ReconcileConfig::default(),
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();
        assert_eq!(common.len(), 1);
        assert_eq!(common[0].period, 100.0);
    }

    #[test]
    fn index_aligned_misses_swapped_lists() {
        let a = detection(&[50.0, 100.0]);
        let b = detection(&[100.0, 50.0]);
        let cfg = ReconcileConfig::default().with_strategy(MatchStrategy::IndexAligned);
        let common = same_periods(
            &band(&a),
            &band(&b),
            &wwz(),
            &cfg,
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();
        assert!(common.is_empty());
    }

    #[test]
    fn index_aligned_cycles_shorter_list() {
        let a = detection(&[100.0]);
        let b = detection(&[300.0, 100.0, 30.0]);
        let cfg = ReconcileConfig::default().with_strategy(MatchStrategy::IndexAligned);
        let common = same_periods(
            &band(&a),
            &band(&b),
            &wwz(),
            &cfg,
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();
        // [100, 100, 100] against [300, 100, 30]: only position 1 agrees,
        // reported with b's errors
        assert_eq!(common.len(), 1);
        assert_eq!(common[0].period, 100.0);
        assert_eq!(common[0].upper_error, 10.0);

        let swapped = same_periods(
            &band(&b),
            &band(&a),
            &wwz(),
            &cfg,
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();
        assert_eq!(swapped.len(), 1);
        assert_eq!(swapped[0].period, 100.0);
    }

    #[test]
    fn empty_lists_give_no_matches() {
        let a = detection(&[]);
        let b = detection(&[100.0]);
        for strategy in [MatchStrategy::Nearest, MatchStrategy::IndexAligned] {
            let cfg = ReconcileConfig::default().with_strategy(strategy);
            let mut rng = StdRng::seed_from_u64(0);
            assert!(same_periods(&band(&a), &band(&b), &wwz(), &cfg, &mut rng).unwrap().is_empty());
            assert!(same_periods(&band(&b), &band(&a), &wwz(), &cfg, &mut rng).unwrap().is_empty());
        }
    }

    #[test]
    fn invalid_bounds_are_fatal() {
        let a = detection(&[100.0]);
        let err = same_periods(
            &band(&a),
            &band(&a),
            &WwzConfig::new(10, 20),
            &ReconcileConfig::default(),
            &mut StdRng::seed_from_u64(0),
        );
        assert!(matches!(err, Err(HybridError::Wwz(_))));
    }
}
