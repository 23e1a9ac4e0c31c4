//! Statistical helper functions for the qhx period search.
//!
//! Descriptive statistics live here; piecewise interpolation is in
//! [`interp`] and the dense solvers used by the weighted fits and the
//! spline construction are in [`linalg`].

pub mod interp;
pub mod linalg;

pub use interp::{CubicSpline, interp_linear};
pub use linalg::{solve_dense, solve_small};

/// Arithmetic mean of a slice. Returns 0.0 if empty.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let sum: f64 = data.iter().sum();
    sum / data.len() as f64
}

/// Population standard deviation (N denominator). Returns 0.0 if empty.
pub fn std_population(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    let ss: f64 = data.iter().map(|&x| (x - m) * (x - m)).sum();
    (ss / data.len() as f64).sqrt()
}

/// Returns a copy of `data` sorted ascending. NaN compares equal to everything.
pub fn sorted_copy(data: &[f64]) -> Vec<f64> {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

/// Median of pre-sorted data. For even length, averages the middle two values.
///
/// # Panics
///
/// Panics if `sorted` is empty.
pub fn median(sorted: &[f64]) -> f64 {
    assert!(!sorted.is_empty(), "median: input must not be empty");
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Median of unsorted data. Returns NaN if empty.
pub fn median_of(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    median(&sorted_copy(data))
}

/// Median absolute deviation with constant 1: `median(|x - median(x)|)`.
/// Returns NaN if empty.
pub fn median_abs_deviation(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let med = median_of(data);
    let devs: Vec<f64> = data.iter().map(|&x| (x - med).abs()).collect();
    median_of(&devs)
}

/// Plotting-position quantiles with `alphap = betap = 0.4`.
///
/// For each probability `p` the position is `aleph = n*p + 0.4 + 0.2*p`,
/// clipped to `[1, n-1]`, and the result interpolates linearly between the
/// two order statistics around it. Returns NaN for every probability when
/// `data` is empty.
pub fn mquantiles(data: &[f64], probs: &[f64]) -> Vec<f64> {
    const ALPHAP: f64 = 0.4;
    const BETAP: f64 = 0.4;

    let sorted = sorted_copy(data);
    let n = sorted.len();
    if n == 0 {
        return vec![f64::NAN; probs.len()];
    }
    if n == 1 {
        return vec![sorted[0]; probs.len()];
    }

    let nf = n as f64;
    probs
        .iter()
        .map(|&p| {
            let m = ALPHAP + p * (1.0 - ALPHAP - BETAP);
            let aleph = nf * p + m;
            let k = aleph.clamp(1.0, nf - 1.0).floor();
            let gamma = (aleph - k).clamp(0.0, 1.0);
            let k = k as usize;
            (1.0 - gamma) * sorted[k - 1] + gamma * sorted[k]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&data), 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_mean_empty() {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_std_population() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(std_population(&data), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_median_even() {
        assert_relative_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5, epsilon = 1e-6);
    }

    #[test]
    fn test_median_of_unsorted() {
        assert_relative_eq!(median_of(&[9.0, 1.0, 5.0]), 5.0);
        assert!(median_of(&[]).is_nan());
    }

    #[test]
    fn test_median_abs_deviation() {
        // median = 3, |dev| = [2,1,0,1,6] -> median 1
        let data = [1.0, 2.0, 3.0, 4.0, 9.0];
        assert_relative_eq!(median_abs_deviation(&data), 1.0);
    }

    #[test]
    fn test_mquantiles_reference_values() {
        // scipy.stats.mstats.mquantiles([1..=10], [0.25, 0.75]) = [2.95, 8.05]
        let data: Vec<f64> = (1..=10).map(f64::from).collect();
        let q = mquantiles(&data, &[0.25, 0.75]);
        assert_relative_eq!(q[0], 2.95, epsilon = 1e-12);
        assert_relative_eq!(q[1], 8.05, epsilon = 1e-12);
    }

    #[test]
    fn test_mquantiles_unsorted_input() {
        let data = [5.0, 1.0, 4.0, 2.0, 3.0];
        let q = mquantiles(&data, &[0.5]);
        assert_relative_eq!(q[0], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mquantiles_degenerate_lengths() {
        assert!(mquantiles(&[], &[0.25])[0].is_nan());
        assert_eq!(mquantiles(&[7.0], &[0.25, 0.75]), vec![7.0, 7.0]);
    }

    #[test]
    #[should_panic(expected = "median: input must not be empty")]
    fn test_median_empty_panics() {
        median(&[]);
    }
}
