//! # qhx-wwz
//!
//! Weighted wavelet Z-transform of irregularly sampled light curves.
//!
//! ```ignore
//! use qhx_wwz::{WwzConfig, wwz};
//!
//! let config = WwzConfig::new(80, 800).with_period_bounds(2000.0, 10.0);
//! let result = wwz(&time, &magnitude, &config)?;
//! let z = result.power(); // [n_freq][n_tau]
//! ```

mod error;
mod grid;
mod transform;

pub use error::WwzError;
pub use grid::{
    DEFAULT_DECAY_FACTOR, FrequencyGrid, WwzConfig, decay_constant, estimate_wavelet_periods,
};
pub use transform::{MIN_POINTS, WwzResult, time_divisions, wwz, wwz_on_grid};
