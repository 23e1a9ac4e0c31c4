//! Superlet transforms: geometric means of Morlet CWTs of increasing order.
//!
//! The multiplicative transform combines a fixed set of orders at every
//! scale. The fractional adaptive transform lets the order grow linearly
//! with frequency and uses fractional exponents between integer orders.

use num_complex::Complex;
use tracing::debug;

use crate::cwt::cwt_sl;
use crate::error::WaveletError;
use crate::morlet::{MorletSl, WaveletKind};
use crate::series::TimeSeries;

/// Configuration for [`superlet`].
///
/// # Example
///
/// ```ignore
/// use qhx_wavelet::SuperletConfig;
///
/// let config = SuperletConfig::new(30)
///     .with_c_1(5.0)
///     .with_adaptive(true);
/// ```
#[derive(Clone, Debug)]
pub struct SuperletConfig {
    order_max: u32,
    order_min: u32,
    c_1: f64,
    adaptive: bool,
    wavelet: WaveletKind,
}

impl SuperletConfig {
    /// Creates a configuration with the given maximum order.
    ///
    /// Defaults: `order_min = 1`, `c_1 = 3`, multiplicative (non-adaptive),
    /// Morlet superlet wavelet.
    pub fn new(order_max: u32) -> Self {
        Self {
            order_max,
            order_min: 1,
            c_1: 3.0,
            adaptive: false,
            wavelet: WaveletKind::MorletSl,
        }
    }

    /// Sets the minimum order.
    pub fn with_order_min(mut self, order_min: u32) -> Self {
        self.order_min = order_min;
        self
    }

    /// Sets the number of cycles of the first-order wavelet.
    pub fn with_c_1(mut self, c_1: f64) -> Self {
        self.c_1 = c_1;
        self
    }

    /// Chooses the fractional adaptive transform instead of the multiplicative one.
    pub fn with_adaptive(mut self, adaptive: bool) -> Self {
        self.adaptive = adaptive;
        self
    }

    /// Sets the wavelet family.
    pub fn with_wavelet(mut self, wavelet: WaveletKind) -> Self {
        self.wavelet = wavelet;
        self
    }

    /// Returns the maximum order.
    pub fn order_max(&self) -> u32 {
        self.order_max
    }

    /// Returns the minimum order.
    pub fn order_min(&self) -> u32 {
        self.order_min
    }

    /// Returns the number of cycles of the first-order wavelet.
    pub fn c_1(&self) -> f64 {
        self.c_1
    }

    /// Returns whether the adaptive transform is selected.
    pub fn adaptive(&self) -> bool {
        self.adaptive
    }

    /// Returns the wavelet family.
    pub fn wavelet(&self) -> WaveletKind {
        self.wavelet
    }
}

impl Default for SuperletConfig {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Complex superlet spectrum `[n_scales][n_times]`.
#[derive(Clone, Debug)]
pub struct Scalogram {
    coefficients: Vec<Vec<Complex<f64>>>,
    scales: Vec<f64>,
}

impl Scalogram {
    pub(crate) fn new(coefficients: Vec<Vec<Complex<f64>>>, scales: Vec<f64>) -> Self {
        Self {
            coefficients,
            scales,
        }
    }

    /// Returns the complex coefficients `[n_scales][n_times]`.
    pub fn coefficients(&self) -> &[Vec<Complex<f64>>] {
        &self.coefficients
    }

    /// Returns the scales, one per row.
    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    /// Returns the number of scales.
    pub fn n_scales(&self) -> usize {
        self.scales.len()
    }

    /// Returns the number of time points.
    pub fn n_times(&self) -> usize {
        self.coefficients.first().map_or(0, Vec::len)
    }

    /// Amplitude scalogram `|W(s,t)|`.
    pub fn amplitude(&self) -> Vec<Vec<f64>> {
        self.coefficients
            .iter()
            .map(|row| row.iter().map(|c| c.norm()).collect())
            .collect()
    }

    /// Power scalogram `|W(s,t)|^2`.
    pub fn power(&self) -> Vec<Vec<f64>> {
        self.coefficients
            .iter()
            .map(|row| row.iter().map(|c| c.norm_sqr()).collect())
            .collect()
    }
}

/// Principal power `z^p`. Zero stays zero for every `p != 0`; `z^0 = 1`.
pub fn principal_power(z: Complex<f64>, p: f64) -> Complex<f64> {
    if p == 0.0 {
        return Complex::new(1.0, 0.0);
    }
    let r = z.norm();
    if r == 0.0 {
        return Complex::new(0.0, 0.0);
    }
    Complex::from_polar(r.powf(p), z.arg() * p)
}

/// Superlet transform of `series` over `scales`.
///
/// Dispatches to [`fractional_adaptive_slt`] or [`multiplicative_slt`]
/// according to `config.adaptive()`.
///
/// # Errors
///
/// | Variant | Trigger |
/// |---------|---------|
/// | [`WaveletError::InvalidFrequencyRange`] | empty, non-positive, or non-monotonic scales; adaptive scales not descending |
/// | [`WaveletError::InvalidConfig`] | `order_min == 0`, `order_max < order_min`, or `c_1 <= 0` |
#[tracing::instrument(skip(series, scales), fields(n = series.len(), n_scales = scales.len()))]
pub fn superlet(
    series: &TimeSeries,
    scales: &[f64],
    config: &SuperletConfig,
) -> Result<Scalogram, WaveletError> {
    match config.wavelet {
        WaveletKind::MorletSl => {}
    }
    let data = series.as_slice();
    let coefficients = if config.adaptive {
        fractional_adaptive_slt(
            data,
            series.samplerate(),
            scales,
            config.order_max,
            config.order_min,
            config.c_1,
        )?
    } else {
        multiplicative_slt(
            data,
            series.samplerate(),
            scales,
            config.order_max,
            config.order_min,
            config.c_1,
        )?
    };
    Ok(Scalogram::new(coefficients, scales.to_vec()))
}

fn validate_orders(order_max: u32, order_min: u32, c_1: f64) -> Result<(), WaveletError> {
    if order_min == 0 {
        return Err(WaveletError::InvalidConfig("order_min must be >= 1".into()));
    }
    if order_max < order_min {
        return Err(WaveletError::InvalidConfig(format!(
            "order_max ({order_max}) must be >= order_min ({order_min})"
        )));
    }
    if !(c_1.is_finite() && c_1 > 0.0) {
        return Err(WaveletError::InvalidConfig(format!(
            "c_1 must be finite and > 0, got {c_1}"
        )));
    }
    Ok(())
}

fn validate_scales(scales: &[f64]) -> Result<(), WaveletError> {
    if scales.is_empty() {
        return Err(WaveletError::InvalidFrequencyRange("no scales given".into()));
    }
    if scales.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
        return Err(WaveletError::InvalidFrequencyRange(
            "scales must be finite and > 0".into(),
        ));
    }
    let ascending = scales.windows(2).all(|w| w[1] > w[0]);
    let descending = scales.windows(2).all(|w| w[1] < w[0]);
    if !(ascending || descending) {
        return Err(WaveletError::InvalidFrequencyRange(
            "scales must be strictly monotonic".into(),
        ));
    }
    Ok(())
}

/// Multiplicative superlet transform.
///
/// Orders `order_min..=order_max` use `c_1 * order` cycles each; the
/// result is the product of each order's CWT raised to `1 / n_orders`.
pub fn multiplicative_slt(
    data: &[f64],
    samplerate: f64,
    scales: &[f64],
    order_max: u32,
    order_min: u32,
    c_1: f64,
) -> Result<Vec<Vec<Complex<f64>>>, WaveletError> {
    validate_orders(order_max, order_min, c_1)?;
    validate_scales(scales)?;

    let dt = 1.0 / samplerate;
    let order_num = f64::from(order_max + 1 - order_min);
    let exponent = 1.0 / order_num;

    let mut gmean: Option<Vec<Vec<Complex<f64>>>> = None;
    for order in order_min..=order_max {
        let wavelet = MorletSl::new(c_1 * f64::from(order));
        let spec = cwt_sl(data, &wavelet, scales, dt);
        match gmean.as_mut() {
            None => {
                gmean = Some(
                    spec.into_iter()
                        .map(|row| row.into_iter().map(|z| principal_power(z, exponent)).collect())
                        .collect(),
                );
            }
            Some(acc) => {
                for (acc_row, row) in acc.iter_mut().zip(spec) {
                    for (a, z) in acc_row.iter_mut().zip(row) {
                        *a *= principal_power(z, exponent);
                    }
                }
            }
        }
    }
    debug!(orders = order_num, "multiplicative superlet done");
    Ok(gmean.unwrap_or_default())
}

/// Linear map from frequency to (fractional) order.
///
/// `freq[0]` maps to `order_min` and the last frequency to `order_max`.
///
/// # Errors
///
/// [`WaveletError::InvalidFrequencyRange`] unless `freq[0] < freq[last]`.
pub fn compute_adaptive_order(
    freq: &[f64],
    order_min: u32,
    order_max: u32,
) -> Result<Vec<f64>, WaveletError> {
    let (Some(&f_min), Some(&f_max)) = (freq.first(), freq.last()) else {
        return Err(WaveletError::InvalidFrequencyRange("no frequencies given".into()));
    };
    if !(f_min < f_max) {
        return Err(WaveletError::InvalidFrequencyRange(format!(
            "first frequency {f_min} must be below last frequency {f_max}"
        )));
    }
    let span = f64::from(order_max) - f64::from(order_min);
    Ok(freq
        .iter()
        .map(|&f| f64::from(order_min) + span * (f - f_min) / (f_max - f_min))
        .collect())
}

/// Fractional adaptive superlet transform.
///
/// `scales` must run from high to low (ascending frequency). Every scale
/// gets its own exponent `1 / (order - order_min + 1)`; scales between two
/// integer orders take the next order's CWT to the fractional power
/// `alpha * exponent`, where `alpha` is the fractional part of the order.
pub fn fractional_adaptive_slt(
    data: &[f64],
    samplerate: f64,
    scales: &[f64],
    order_max: u32,
    order_min: u32,
    c_1: f64,
) -> Result<Vec<Vec<Complex<f64>>>, WaveletError> {
    validate_orders(order_max, order_min, c_1)?;
    validate_scales(scales)?;

    let dt = 1.0 / samplerate;
    let fois: Vec<f64> = scales
        .iter()
        .map(|s| 1.0 / (2.0 * std::f64::consts::PI * s))
        .collect();
    let orders = compute_adaptive_order(&fois, order_min, order_max)?;
    let orders_int: Vec<u32> = orders.iter().map(|o| o.floor() as u32).collect();

    let mut unique = orders_int.clone();
    unique.dedup();
    let wavelets: Vec<MorletSl> = unique
        .iter()
        .map(|&o| MorletSl::new(c_1 * f64::from(o)))
        .collect();

    let exponents: Vec<f64> = orders
        .iter()
        .map(|o| 1.0 / (o - f64::from(order_min) + 1.0))
        .collect();
    let alphas: Vec<f64> = orders
        .iter()
        .zip(orders_int.iter())
        .map(|(o, &oi)| o - f64::from(oi))
        .collect();
    let jumps: Vec<usize> = orders_int
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[1] != w[0])
        .map(|(i, _)| i)
        .collect();

    let mut gmean: Vec<Vec<Complex<f64>>> = cwt_sl(data, &wavelets[0], scales, dt)
        .into_iter()
        .zip(exponents.iter())
        .map(|(row, &e)| row.into_iter().map(|z| principal_power(z, e)).collect())
        .collect();

    let mut last_jump = 1;
    for (i, &jump) in jumps.iter().enumerate() {
        let Some(wavelet) = wavelets.get(i + 1) else {
            break;
        };
        let next_spec = cwt_sl(data, wavelet, &scales[last_jump..], dt);
        for (offset, row) in next_spec.into_iter().enumerate() {
            let k = last_jump + offset;
            let power = if k <= jump {
                alphas[k] * exponents[k]
            } else {
                exponents[k]
            };
            for (a, z) in gmean[k].iter_mut().zip(row) {
                *a *= principal_power(z, power);
            }
        }
        last_jump = jump + 1;
    }

    debug!(
        order_min,
        order_max,
        n_wavelets = wavelets.len(),
        "adaptive superlet done"
    );
    Ok(gmean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn tone(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs).cos()).collect()
    }

    fn scales_for(foi: &[f64]) -> Vec<f64> {
        foi.iter().map(|f| 1.0 / (2.0 * PI * f)).collect()
    }

    #[test]
    fn config_defaults() {
        let config = SuperletConfig::default();
        assert_eq!(config.order_max(), 1);
        assert_eq!(config.order_min(), 1);
        assert_eq!(config.c_1(), 3.0);
        assert!(!config.adaptive());
        assert_eq!(config.wavelet(), WaveletKind::MorletSl);
    }

    #[test]
    fn principal_power_edge_cases() {
        let zero = Complex::new(0.0, 0.0);
        assert_eq!(principal_power(zero, 0.5), zero);
        assert_eq!(principal_power(Complex::new(3.0, -4.0), 0.0), Complex::new(1.0, 0.0));
        let z = principal_power(Complex::new(-4.0, 0.0), 0.5);
        assert_relative_eq!(z.re, 0.0, epsilon = 1e-12);
        assert_relative_eq!(z.im, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn adaptive_order_endpoints() {
        let orders = compute_adaptive_order(&[1.0, 2.0, 3.0], 1, 5).unwrap();
        assert_eq!(orders, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn adaptive_order_rejects_descending() {
        let err = compute_adaptive_order(&[3.0, 2.0], 1, 5).unwrap_err();
        assert!(matches!(err, WaveletError::InvalidFrequencyRange(_)));
    }

    #[test]
    fn adaptive_rejects_ascending_scales() {
        let data = tone(10.0, 100.0, 128);
        // Ascending scales are descending frequencies.
        let scales = scales_for(&[20.0, 10.0, 5.0]);
        let err = fractional_adaptive_slt(&data, 100.0, &scales, 3, 1, 3.0).unwrap_err();
        assert!(matches!(err, WaveletError::InvalidFrequencyRange(_)));
    }

    #[test]
    fn rejects_non_monotonic_scales() {
        let data = tone(10.0, 100.0, 128);
        let err = multiplicative_slt(&data, 100.0, &[0.1, 0.05, 0.2], 2, 1, 3.0).unwrap_err();
        assert!(matches!(err, WaveletError::InvalidFrequencyRange(_)));
        let err = multiplicative_slt(&data, 100.0, &[], 2, 1, 3.0).unwrap_err();
        assert!(matches!(err, WaveletError::InvalidFrequencyRange(_)));
    }

    #[test]
    fn rejects_bad_orders() {
        let data = tone(10.0, 100.0, 64);
        let scales = scales_for(&[5.0, 10.0]);
        assert!(matches!(
            multiplicative_slt(&data, 100.0, &scales, 1, 2, 3.0),
            Err(WaveletError::InvalidConfig(_))
        ));
        assert!(matches!(
            multiplicative_slt(&data, 100.0, &scales, 2, 0, 3.0),
            Err(WaveletError::InvalidConfig(_))
        ));
    }

    #[test]
    fn single_order_equals_plain_cwt() {
        let data = tone(10.0, 100.0, 256);
        let scales = scales_for(&[5.0, 10.0, 15.0]);
        let slt = multiplicative_slt(&data, 100.0, &scales, 1, 1, 3.0).unwrap();
        let cwt = cwt_sl(&data, &MorletSl::new(3.0), &scales, 0.01);
        for (a_row, b_row) in slt.iter().zip(cwt.iter()) {
            for (a, b) in a_row.iter().zip(b_row.iter()) {
                assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
                assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn geometric_mean_combines_incrementally() {
        // |SLT(1..=4)| == |SLT(1..=3)|^(3/4) * |CWT(order 4)|^(1/4)
        let fs = 100.0;
        let data = tone(8.0, fs, 300);
        let scales = scales_for(&[6.0, 8.0, 10.0]);
        let full = multiplicative_slt(&data, fs, &scales, 4, 1, 2.0).unwrap();
        let partial = multiplicative_slt(&data, fs, &scales, 3, 1, 2.0).unwrap();
        let fourth = cwt_sl(&data, &MorletSl::new(8.0), &scales, 1.0 / fs);
        for s in 0..scales.len() {
            for t in 100..200 {
                let combined = partial[s][t].norm().powf(0.75) * fourth[s][t].norm().powf(0.25);
                assert_relative_eq!(full[s][t].norm(), combined, max_relative = 1e-9);
            }
        }
    }

    #[test]
    fn adaptive_with_flat_order_is_plain_cwt() {
        let fs = 100.0;
        let data = tone(10.0, fs, 256);
        let scales = scales_for(&[5.0, 10.0, 15.0]);
        let fa = fractional_adaptive_slt(&data, fs, &scales, 2, 2, 3.0).unwrap();
        let cwt = cwt_sl(&data, &MorletSl::new(6.0), &scales, 1.0 / fs);
        for (a_row, b_row) in fa.iter().zip(cwt.iter()) {
            for (a, b) in a_row.iter().zip(b_row.iter()) {
                assert_relative_eq!(a.norm(), b.norm(), max_relative = 1e-9, epsilon = 1e-15);
            }
        }
    }

    #[test]
    fn adaptive_lowest_frequency_keeps_first_order() {
        // The first scale always has order_min and exponent 1.
        let fs = 100.0;
        let data = tone(10.0, fs, 256);
        let scales = scales_for(&[5.0, 10.0, 15.0, 20.0]);
        let fa = fractional_adaptive_slt(&data, fs, &scales, 4, 1, 3.0).unwrap();
        let first = cwt_sl(&data, &MorletSl::new(3.0), &scales[..1], 1.0 / fs);
        for (a, b) in fa[0].iter().zip(first[0].iter()) {
            assert_relative_eq!(a.norm(), b.norm(), max_relative = 1e-9, epsilon = 1e-15);
        }
    }

    #[test]
    fn adaptive_peaks_at_signal_frequency() {
        let fs = 100.0;
        let data = tone(10.0, fs, 800);
        let foi: Vec<f64> = (0..16).map(|i| 5.0 + i as f64).collect();
        let ts = TimeSeries::new(data, fs).unwrap();
        let config = SuperletConfig::new(3).with_adaptive(true);
        let result = superlet(&ts, &scales_for(&foi), &config).unwrap();
        assert_eq!(result.n_scales(), 16);
        assert_eq!(result.n_times(), 800);
        let amp = result.amplitude();
        let centre: Vec<f64> = amp
            .iter()
            .map(|row| row[300..500].iter().sum::<f64>())
            .collect();
        let best = centre
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(foi[best], 10.0);
    }
}
