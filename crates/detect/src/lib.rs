//! # qhx-detect
//!
//! Multi-band period detection for whole objects and catalogues.
//!
//! | Module | Role |
//! |--------|------|
//! | light curves | [`LightCurve`] with MAD and z-score cleaning, [`TiktokSignal`] injection |
//! | sources | [`LightCurveSource`] supplies one object's bands at a time |
//! | orchestrator | [`ObjectDetector`] / [`detect_object`]: per-band analysis, pairwise matching |
//! | batch | [`run_batch`] over many objects on a worker pool |
//! | mock | [`simple_mock_lc`], [`MockLightCurve`] and [`DrwMock`] synthetic data |
//!
//! A pair of bands without any common period still produces one
//! [`CommonPeriodRecord`], with NaN in every measured field.
//!
//! ```text
//! run_batch()
//!   ├─ LightCurveSource::load(id)
//!   └─ ObjectDetector (per object, own StdRng)
//!        ├─ load       select bands, check min_points, fix grid
//!        ├─ analyze    hybrid2d + periods per band
//!        ├─ reconcile  same_periods per band pair
//!        └─ finish     CommonPeriodRecord per match or null per pair
//! ```
//!
//! ```ignore
//! use qhx_detect::{BatchConfig, DetectionConfig, MemorySource, run_batch};
//!
//! let report = run_batch(&source, &DetectionConfig::new(), &BatchConfig::new().with_seed(7))?;
//! for record in &report.records {
//!     println!("{} {} {}", record.object_id, record.label, record.period);
//! }
//! ```

mod band;
mod batch;
mod error;
mod light_curve;
mod mock;
mod mode;
mod orchestrator;
mod record;
mod source;

pub use band::{BandId, pair_label};
pub use batch::{BatchConfig, BatchReport, ObjectFailure, object_seed, run_batch};
pub use error::DetectError;
pub use light_curve::{DEFAULT_OUTLIER_THRESHOLD, LightCurve, TiktokSignal, generate_tiktok_signal};
pub use mock::{
    DEFAULT_NOISE_EXPONENT, DRW_MEAN_MAGNITUDE, DrwLightCurve, DrwMock, Frame, MockLightCurve,
    OscillationPeriod, TimeUnit, artificial_lc_sampled, powerlaw_psd_gaussian,
    remove_fraction_with_seed, simple_mock_lc,
};
pub use mode::AnalysisMode;
pub use orchestrator::{
    BandFailure, DEFAULT_MIN_POINTS, DetectionConfig, DetectionState, ObjectDetector,
    ObjectReport, Stage, detect_object,
};
pub use record::CommonPeriodRecord;
pub use source::{LightCurveSource, MemorySource, ObjectLightCurves};
