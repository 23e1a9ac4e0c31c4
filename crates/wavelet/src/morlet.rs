//! Morlet wavelet in the superlet parameterisation.
//!
//! The number of cycles inside the Gaussian envelope is fixed per wavelet,
//! so a family of wavelets with increasing cycle counts trades time
//! resolution for frequency resolution.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use num_complex::Complex;

use crate::error::WaveletError;

/// Default envelope width parameter.
pub const DEFAULT_K_SD: f64 = 5.0;

/// Morlet wavelet with `cycles` oscillations under its Gaussian envelope.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MorletSl {
    cycles: f64,
    k_sd: f64,
}

impl MorletSl {
    /// Creates a wavelet with `cycles` cycles and the default envelope width.
    pub fn new(cycles: f64) -> Self {
        Self {
            cycles,
            k_sd: DEFAULT_K_SD,
        }
    }

    /// Sets the envelope width parameter.
    pub fn with_k_sd(mut self, k_sd: f64) -> Self {
        self.k_sd = k_sd;
        self
    }

    /// Returns the number of cycles.
    pub fn cycles(&self) -> f64 {
        self.cycles
    }

    /// Returns the envelope width parameter.
    pub fn k_sd(&self) -> f64 {
        self.k_sd
    }

    /// Evaluates the wavelet at time `t` and scale `s`.
    ///
    /// `B_c * exp(i t/s) * exp(-0.5 * (k_sd * (t/s) / (2π c))^2)` with
    /// `B_c = k_sd / (s * c * (2π)^1.5)`, which also carries the scale
    /// normalisation.
    pub fn eval(&self, t: f64, s: f64) -> Complex<f64> {
        let ts = t / s;
        let b_c = self.k_sd / (s * self.cycles * (2.0 * PI).powf(1.5));
        let envelope = (-0.5 * (self.k_sd * ts / (2.0 * PI * self.cycles)).powi(2)).exp();
        Complex::from_polar(b_c * envelope, ts)
    }
}

/// Fourier period of a superlet Morlet scale.
pub fn fourier_period(scale: f64) -> f64 {
    2.0 * PI * scale
}

/// Scale whose Fourier period is `period`.
pub fn scale_from_period(period: f64) -> f64 {
    period / (2.0 * PI)
}

/// Wavelet families accepted by the superlet transforms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WaveletKind {
    /// Morlet wavelet in the superlet parameterisation.
    #[default]
    MorletSl,
}

impl fmt::Display for WaveletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaveletKind::MorletSl => f.write_str("morlet-sl"),
        }
    }
}

impl FromStr for WaveletKind {
    type Err = WaveletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "morlet-sl" | "morletsl" | "morlet" => Ok(WaveletKind::MorletSl),
            _ => Err(WaveletError::InvalidWaveletType(s.to_string())),
        }
    }
}
