//! End-to-end tests: light curve to periods, significance and matching.

use std::f64::consts::PI;

use qhx_hybrid::{
    BandInput, PeakConfig, ReconcileConfig, SignificanceConfig, hybrid2d, periods, same_periods,
};
use qhx_wwz::WwzConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Sinusoid of `period` days on random epochs with white noise.
fn light_curve(seed: u64, n: usize, span: f64, period: f64, amplitude: f64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut t: Vec<f64> = (0..n).map(|_| rng.random_range(0.0..span)).collect();
    t.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let noise = Normal::new(0.0, 0.05).unwrap();
    let y = t
        .iter()
        .map(|&ti| 22.0 + amplitude * (2.0 * PI * ti / period).sin() + noise.sample(&mut rng))
        .collect();
    (t, y)
}

#[test]
fn recovers_injected_period() {
    let (t, y) = light_curve(42, 1000, 3650.0, 100.0, 0.3);
    let wwz = WwzConfig::new(40, 200).with_period_bounds(400.0, 20.0);

    let hybrid = hybrid2d(&t, &y, &wwz).unwrap();
    let detection = periods(hybrid.correlation(), &wwz.grid().unwrap(), &PeakConfig::default()).unwrap();

    let found = detection.periods();
    assert!(
        found.iter().any(|p| (p - 100.0).abs() <= 10.0),
        "no period near 100 d in {found:?}"
    );
    let best = detection
        .peaks
        .iter()
        .min_by(|a, b| (a.period - 100.0).abs().partial_cmp(&(b.period - 100.0).abs()).unwrap())
        .unwrap();
    assert!(best.upper_error == -1.0 || best.upper_error >= 0.0);
    assert!(best.lower_error == -1.0 || best.lower_error >= 0.0);
    // peaks come back in ascending frequency
    assert!(detection.peaks.windows(2).all(|w| w[0].index < w[1].index));
}

#[test]
fn identical_bands_share_every_period() {
    let (t, y) = light_curve(7, 300, 2000.0, 80.0, 0.3);
    let wwz = WwzConfig::new(20, 60).with_period_bounds(300.0, 20.0);
    let hybrid = hybrid2d(&t, &y, &wwz).unwrap();
    let detection = periods(hybrid.correlation(), &wwz.grid().unwrap(), &PeakConfig::default()).unwrap();
    assert!(!detection.is_empty());

    let band = BandInput {
        time: &t,
        magnitude: &y,
        errors: None,
        detection: &detection,
    };
    let config = ReconcileConfig::default().with_significance(SignificanceConfig::new(5));
    let common = same_periods(&band, &band, &wwz, &config, &mut StdRng::seed_from_u64(3)).unwrap();

    assert_eq!(common.len(), detection.peaks.len());
    for (c, p) in common.iter().zip(&detection.peaks) {
        assert_eq!(c.period, p.period);
        assert_eq!(c.upper_error, p.upper_error);
        assert_eq!(c.lower_error, p.lower_error);
        assert!((0.0..=1.0).contains(&c.significance), "significance {}", c.significance);
    }
}
