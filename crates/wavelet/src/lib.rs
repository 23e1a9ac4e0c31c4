//! # qhx-wavelet
//!
//! Superlet time-frequency analysis of uniformly sampled signals.
//!
//! ## Analysis Pipeline
//!
//! ```mermaid
//! graph LR
//!     A["TimeSeries::new(data, fs)?"] -->|"validate"| B["TimeSeries"]
//!     B -->|"superlet(&ts, &scales, &config)?"| C["Scalogram"]
//!     C --> D[".amplitude()"]
//!     C --> E[".power()"]
//! ```
//!
//! ## Transforms
//!
//! | Function | Orders |
//! |----------|--------|
//! | [`multiplicative_slt`] | fixed set `order_min..=order_max` at every scale |
//! | [`fractional_adaptive_slt`] | order grows linearly with frequency, fractional in between |
//!
//! ## Quick Start
//!
//! ```ignore
//! use qhx_wavelet::{SuperletConfig, TimeSeries, scale_from_period, superlet};
//!
//! let ts = TimeSeries::new(signal, 1000.0)?;
//! let scales: Vec<f64> = (1..=100).map(|f| scale_from_period(1.0 / f as f64)).collect();
//! let config = SuperletConfig::new(30).with_c_1(5.0).with_adaptive(true);
//! let amplitude = superlet(&ts, &scales, &config)?.amplitude();
//! ```

mod cwt;
mod error;
mod morlet;
mod series;
mod superlet;
mod testdata;

pub use cwt::{cwt_sl, superlet_support};
pub use error::WaveletError;
pub use morlet::{DEFAULT_K_SD, MorletSl, WaveletKind, fourier_period, scale_from_period};
pub use series::TimeSeries;
pub use superlet::{
    Scalogram, SuperletConfig, compute_adaptive_order, fractional_adaptive_slt,
    multiplicative_slt, principal_power, superlet,
};
pub use testdata::gen_superlet_testdata;
