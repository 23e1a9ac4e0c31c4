use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Top-level qhx configuration.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct QhxConfig {
    /// Global RNG seed.
    #[serde(default)]
    pub seed: Option<u64>,

    /// I/O settings.
    #[serde(default)]
    pub io: IoConfig,

    /// WWZ grid settings.
    #[serde(default)]
    pub grid: GridToml,

    /// Peak detection settings.
    #[serde(default)]
    pub peaks: PeaksToml,

    /// Shuffle significance settings.
    #[serde(default)]
    pub significance: SignificanceToml,

    /// Cross-band matching settings.
    #[serde(default)]
    pub reconcile: ReconcileToml,

    /// Superlet settings.
    #[serde(default)]
    pub superlet: SuperletToml,

    /// Batch settings.
    #[serde(default)]
    pub batch: BatchToml,
}

/// Reads and parses a TOML configuration file.
pub fn load(path: &Path) -> Result<QhxConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse config: {}", path.display()))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IoConfig {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    /// `csv` or `parquet`; inferred from the output extension when unset.
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default = "default_compression")]
    pub compression: String,
    #[serde(default = "default_row_group_size")]
    pub row_group_size: usize,
    #[serde(default)]
    pub columns: ColumnsToml,
    /// Stored band value to band name, e.g. `"1" = "g"`.
    #[serde(default)]
    pub band_map: BTreeMap<String, String>,
    #[serde(default)]
    pub include_errors: bool,
    #[serde(default = "default_outliers")]
    pub outliers: String,
    #[serde(default = "default_outlier_threshold")]
    pub outlier_threshold: f64,
    /// Damped oscillation injected into every band after cleaning.
    #[serde(default)]
    pub inject: Option<InjectToml>,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            format: None,
            compression: default_compression(),
            row_group_size: default_row_group_size(),
            columns: ColumnsToml::default(),
            band_map: BTreeMap::new(),
            include_errors: false,
            outliers: default_outliers(),
            outlier_threshold: default_outlier_threshold(),
            inject: None,
        }
    }
}

fn default_compression() -> String {
    "snappy".to_string()
}
fn default_row_group_size() -> usize {
    1_000_000
}
fn default_outliers() -> String {
    "mad".to_string()
}
fn default_outlier_threshold() -> f64 {
    3.0
}

/// `[io.inject]`: tik-tok signal parameters.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InjectToml {
    /// Period at the first observation (days).
    pub initial_period: f64,
    #[serde(default)]
    pub amplitude_damping: f64,
    #[serde(default)]
    pub frequency_damping: f64,
    /// Signal power over magnitude variance; unscaled when unset.
    #[serde(default)]
    pub snr: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnsToml {
    #[serde(default = "default_object_id_column")]
    pub object_id: String,
    #[serde(default = "default_band_column")]
    pub band: String,
    #[serde(default = "default_time_column")]
    pub time: String,
    #[serde(default = "default_magnitude_column")]
    pub magnitude: String,
    #[serde(default = "default_error_column")]
    pub error: String,
}

impl Default for ColumnsToml {
    fn default() -> Self {
        Self {
            object_id: default_object_id_column(),
            band: default_band_column(),
            time: default_time_column(),
            magnitude: default_magnitude_column(),
            error: default_error_column(),
        }
    }
}

fn default_object_id_column() -> String {
    "objectId".to_string()
}
fn default_band_column() -> String {
    "filter".to_string()
}
fn default_time_column() -> String {
    "mjd".to_string()
}
fn default_magnitude_column() -> String {
    "psMag".to_string()
}
fn default_error_column() -> String {
    "psMagErr".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridToml {
    #[serde(default = "default_ntau")]
    pub ntau: usize,
    #[serde(default = "default_ngrid")]
    pub ngrid: usize,
    /// Longer period bound (days); estimated from the data when unset.
    #[serde(default)]
    pub min_period: Option<f64>,
    /// Shorter period bound (days).
    #[serde(default)]
    pub max_period: Option<f64>,
    #[serde(default = "default_decay_factor")]
    pub decay_factor: f64,
}

impl Default for GridToml {
    fn default() -> Self {
        Self {
            ntau: default_ntau(),
            ngrid: default_ngrid(),
            min_period: None,
            max_period: None,
            decay_factor: default_decay_factor(),
        }
    }
}

fn default_ntau() -> usize {
    80
}
fn default_ngrid() -> usize {
    800
}
fn default_decay_factor() -> f64 {
    qhx_wwz::DEFAULT_DECAY_FACTOR
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeaksToml {
    #[serde(default = "default_peak_height")]
    pub peak_height: f64,
    #[serde(default = "default_prominence")]
    pub prominence: f64,
    #[serde(default = "default_fwhm_fraction")]
    pub fwhm_fraction: f64,
}

impl Default for PeaksToml {
    fn default() -> Self {
        Self {
            peak_height: default_peak_height(),
            prominence: default_prominence(),
            fwhm_fraction: default_fwhm_fraction(),
        }
    }
}

fn default_peak_height() -> f64 {
    0.6
}
fn default_prominence() -> f64 {
    0.7
}
fn default_fwhm_fraction() -> f64 {
    0.5
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignificanceToml {
    #[serde(default = "default_num_trials")]
    pub num_significance_trials: usize,
    #[serde(default)]
    pub use_mag_errors: bool,
}

impl Default for SignificanceToml {
    fn default() -> Self {
        Self {
            num_significance_trials: default_num_trials(),
            use_mag_errors: false,
        }
    }
}

fn default_num_trials() -> usize {
    50
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileToml {
    #[serde(default = "default_relative_tolerance")]
    pub relative_tolerance: f64,
    #[serde(default = "default_match_strategy")]
    pub match_strategy: String,
}

impl Default for ReconcileToml {
    fn default() -> Self {
        Self {
            relative_tolerance: default_relative_tolerance(),
            match_strategy: default_match_strategy(),
        }
    }
}

fn default_relative_tolerance() -> f64 {
    0.1
}
fn default_match_strategy() -> String {
    "nearest".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuperletToml {
    #[serde(default = "default_order_min")]
    pub order_min: u32,
    #[serde(default = "default_order_max")]
    pub order_max: u32,
    #[serde(default = "default_c_1")]
    pub c_1: f64,
    #[serde(default)]
    pub adaptive: bool,
    #[serde(default = "default_wavelet")]
    pub wavelet: String,
}

impl Default for SuperletToml {
    fn default() -> Self {
        Self {
            order_min: default_order_min(),
            order_max: default_order_max(),
            c_1: default_c_1(),
            adaptive: false,
            wavelet: default_wavelet(),
        }
    }
}

fn default_order_min() -> u32 {
    1
}
fn default_order_max() -> u32 {
    30
}
fn default_c_1() -> f64 {
    3.0
}
fn default_wavelet() -> String {
    "morlet-sl".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchToml {
    /// Worker threads; all cores when unset.
    #[serde(default)]
    pub workers: Option<usize>,
    /// `dynamic` (every band of an object) or `fixed` (exactly `bands`).
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub bands: Vec<String>,
    #[serde(default = "default_min_points")]
    pub min_points: usize,
    /// Object subset; every object of the table when empty.
    #[serde(default)]
    pub objects: Vec<String>,
}

impl Default for BatchToml {
    fn default() -> Self {
        Self {
            workers: None,
            mode: default_mode(),
            bands: Vec::new(),
            min_points: default_min_points(),
            objects: Vec::new(),
        }
    }
}

fn default_mode() -> String {
    "dynamic".to_string()
}
fn default_min_points() -> usize {
    qhx_detect::DEFAULT_MIN_POINTS
}
