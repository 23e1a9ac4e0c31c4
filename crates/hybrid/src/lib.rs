//! # qhx-hybrid
//!
//! Period detection on the WWZ power surface.
//!
//! ## Pipeline
//!
//! ```mermaid
//! graph LR
//!     A["hybrid2d(t, y, &wwz)?"] -->|"correlation"| B["periods(corr, &grid, &peaks)?"]
//!     B -->|"PeriodDetection"| C["signif_johnson(..)?"]
//!     B -->|"two bands"| D["same_periods(&a, &b, ..)?"]
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use qhx_hybrid::{PeakConfig, hybrid2d, periods};
//! use qhx_wwz::WwzConfig;
//!
//! let wwz = WwzConfig::new(80, 800).with_period_bounds(2000.0, 10.0);
//! let hybrid = hybrid2d(&time, &magnitude, &wwz)?;
//! let detection = periods(hybrid.correlation(), &wwz.grid()?, &PeakConfig::default())?;
//! for peak in &detection.peaks {
//!     println!("{:.1} d (+{:.1} / -{:.1})", peak.period, peak.upper_error, peak.lower_error);
//! }
//! ```

mod correlation;
mod error;
mod hybrid;
mod peaks;
mod periods;
mod reconcile;
mod significance;

pub use correlation::correlation_nd;
pub use error::HybridError;
pub use hybrid::{Hybrid2d, hybrid2d};
pub use peaks::{find_peaks, local_maxima, peak_prominence};
pub use periods::{
    DEGENERATE_ERROR, FullWidth, Peak, PeakConfig, PeriodDetection, correlation_profile,
    full_width, interpolated_profile, period_errors, periods,
};
pub use reconcile::{
    BandInput, CommonPeriod, MatchStrategy, ReconcileConfig, is_close, same_periods,
};
pub use significance::{SignificanceConfig, SignificanceResult, signif_johnson};
