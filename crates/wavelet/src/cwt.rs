//! Continuous wavelet transform with superlet Morlet wavelets.
//!
//! Each scale is a direct convolution of the signal with the sampled
//! wavelet, evaluated through zero-padded FFTs and cropped to the input
//! length ("same" mode).

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::morlet::MorletSl;

/// Sample times covering the wavelet at `scale`, centred on zero.
///
/// The support holds `ceil(M)` points with `M = 10 * scale * cycles / dt`,
/// starting at `(1 - M) / 2 * dt` with spacing `dt`.
pub fn superlet_support(scale: f64, dt: f64, cycles: f64) -> Vec<f64> {
    let m = 10.0 * scale * cycles / dt;
    let count = m.ceil().max(1.0) as usize;
    let start = (1.0 - m) / 2.0;
    (0..count).map(|k| (start + k as f64) * dt).collect()
}

/// Complex CWT coefficients `[n_scales][n_times]` of `data`.
///
/// Every kernel is scaled by `sqrt(dt) / (4π)` before convolution. The
/// signal spectrum is reused across scales that share an FFT length.
pub fn cwt_sl(
    data: &[f64],
    wavelet: &MorletSl,
    scales: &[f64],
    dt: f64,
) -> Vec<Vec<Complex<f64>>> {
    let mut conv = FftConvolver::new(data);
    let norm = dt.sqrt() / (4.0 * PI);
    scales
        .iter()
        .map(|&scale| {
            let kernel: Vec<Complex<f64>> = superlet_support(scale, dt, wavelet.cycles())
                .into_iter()
                .map(|t| wavelet.eval(t, scale) * norm)
                .collect();
            conv.same(&kernel)
        })
        .collect()
}

/// Convolves a fixed real signal against a sequence of complex kernels.
struct FftConvolver<'a> {
    data: &'a [f64],
    planner: FftPlanner<f64>,
    spectra: HashMap<usize, Vec<Complex<f64>>>,
}

impl<'a> FftConvolver<'a> {
    fn new(data: &'a [f64]) -> Self {
        Self {
            data,
            planner: FftPlanner::new(),
            spectra: HashMap::new(),
        }
    }

    fn plans(&mut self, nfft: usize) -> (Arc<dyn Fft<f64>>, Arc<dyn Fft<f64>>) {
        (
            self.planner.plan_fft_forward(nfft),
            self.planner.plan_fft_inverse(nfft),
        )
    }

    /// Central `data.len()` samples of the full linear convolution.
    fn same(&mut self, kernel: &[Complex<f64>]) -> Vec<Complex<f64>> {
        let n = self.data.len();
        let m = kernel.len();
        if n == 0 || m == 0 {
            return vec![Complex::new(0.0, 0.0); n];
        }
        let nfft = (n + m - 1).next_power_of_two();
        let (forward, inverse) = self.plans(nfft);

        let data = self.data;
        let signal = self.spectra.entry(nfft).or_insert_with(|| {
            let mut buf: Vec<Complex<f64>> = data
                .iter()
                .map(|&x| Complex::new(x, 0.0))
                .chain(std::iter::repeat_n(Complex::new(0.0, 0.0), nfft - n))
                .collect();
            forward.process(&mut buf);
            buf
        });

        let mut product: Vec<Complex<f64>> = kernel
            .iter()
            .copied()
            .chain(std::iter::repeat_n(Complex::new(0.0, 0.0), nfft - m))
            .collect();
        forward.process(&mut product);
        for (p, s) in product.iter_mut().zip(signal.iter()) {
            *p *= *s;
        }
        inverse.process(&mut product);

        // rustfft is unnormalized
        let scale = 1.0 / nfft as f64;
        let start = (m - 1) / 2;
        product[start..start + n].iter().map(|&c| c * scale).collect()
    }
}
