//! High-level observation-table reader configuration and orchestration.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use qhx_detect::{
    BandId, DEFAULT_OUTLIER_THRESHOLD, DetectError, LightCurve, LightCurveSource,
    ObjectLightCurves, TiktokSignal, object_seed,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::error::IoError;
use crate::parquet_read::{self, ColumnIndices, Grouped};

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

/// Names of the observation-table columns.
///
/// The defaults follow the forced-source tables the pipeline was built
/// around: `objectId`, `filter`, `mjd`, `psMag`, `psMagErr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    /// Object identifier.
    pub object_id: String,
    /// Photometric band.
    pub band: String,
    /// Observation time (days).
    pub time: String,
    /// Magnitude.
    pub magnitude: String,
    /// Magnitude error; optional in the file.
    pub error: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            object_id: "objectId".into(),
            band: "filter".into(),
            time: "mjd".into(),
            magnitude: "psMag".into(),
            error: "psMagErr".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outlier method
// ---------------------------------------------------------------------------

/// Cleaning applied to every band when an object is loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutlierMethod {
    /// Keep every point.
    None,
    /// Median absolute deviation.
    #[default]
    Mad,
    /// Z-score.
    ZScore,
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutlierMethod::None => "none",
            OutlierMethod::Mad => "mad",
            OutlierMethod::ZScore => "zscore",
        })
    }
}

impl FromStr for OutlierMethod {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(OutlierMethod::None),
            "mad" => Ok(OutlierMethod::Mad),
            "zscore" | "z-score" | "sigma" => Ok(OutlierMethod::ZScore),
            other => Err(IoError::Validation {
                count: 1,
                details: format!("unknown outlier method '{other}' (expected none, mad or zscore)"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// ReaderConfig
// ---------------------------------------------------------------------------

/// Configuration for reading an observation table.
///
/// Use the builder methods (`with_*`) to rename columns, map stored band
/// values (for example `1`..`4`) to band names, and choose cleaning.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    columns: ColumnNames,
    /// Stored band value to band name; unmapped values are used as-is.
    band_map: BTreeMap<String, String>,
    /// Keep magnitude errors and add one Gaussian draw of them to the magnitudes.
    include_errors: bool,
    /// Base seed of the per-object error draw.
    seed: u64,
    outliers: OutlierMethod,
    outlier_threshold: f64,
    /// Damped oscillation added to every band after cleaning.
    injection: Option<TiktokSignal>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            columns: ColumnNames::default(),
            band_map: BTreeMap::new(),
            include_errors: false,
            seed: 0,
            outliers: OutlierMethod::default(),
            outlier_threshold: DEFAULT_OUTLIER_THRESHOLD,
            injection: None,
        }
    }
}

impl ReaderConfig {
    /// Set the column names.
    pub fn with_columns(mut self, columns: ColumnNames) -> Self {
        self.columns = columns;
        self
    }

    /// Map a stored band value to a band name.
    pub fn with_band_alias(mut self, stored: impl Into<String>, name: impl Into<String>) -> Self {
        self.band_map.insert(stored.into(), name.into());
        self
    }

    /// Keep magnitude errors and perturb magnitudes by them.
    pub fn with_include_errors(mut self, include: bool) -> Self {
        self.include_errors = include;
        self
    }

    /// Set the base seed of the error perturbation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the cleaning method and its threshold.
    pub fn with_outliers(mut self, method: OutlierMethod, threshold: f64) -> Self {
        self.outliers = method;
        self.outlier_threshold = threshold;
        self
    }

    /// Inject a damped oscillation into every band after cleaning.
    pub fn with_injection(mut self, signal: Option<TiktokSignal>) -> Self {
        self.injection = signal;
        self
    }

    /// Column names.
    pub fn columns(&self) -> &ColumnNames {
        &self.columns
    }

    /// Whether magnitude errors are kept.
    pub fn include_errors(&self) -> bool {
        self.include_errors
    }

    /// Cleaning method.
    pub fn outliers(&self) -> OutlierMethod {
        self.outliers
    }

    /// Injected signal, if any.
    pub fn injection(&self) -> Option<&TiktokSignal> {
        self.injection.as_ref()
    }

    /// Band name of a stored band value.
    pub fn band_name(&self, stored: &str) -> String {
        self.band_map
            .get(stored)
            .cloned()
            .unwrap_or_else(|| stored.to_string())
    }

    fn validate(&self) -> Result<(), IoError> {
        let mut problems = Vec::new();
        if !(self.outlier_threshold.is_finite() && self.outlier_threshold > 0.0) {
            problems.push(format!(
                "outlier_threshold must be positive, got {}",
                self.outlier_threshold
            ));
        }
        let c = &self.columns;
        for (what, name) in [
            ("object id", &c.object_id),
            ("band", &c.band),
            ("time", &c.time),
            ("magnitude", &c.magnitude),
        ] {
            if name.is_empty() {
                problems.push(format!("{what} column name is empty"));
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(IoError::Validation {
                count: problems.len(),
                details: problems.join("; "),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// ObservationTable
// ---------------------------------------------------------------------------

/// An observation table held in memory, grouped by object and band.
///
/// Cleaning, signal injection and error perturbation happen in
/// [`LightCurveSource::load`], so each worker only touches the object it
/// analyses.
#[derive(Debug, Clone)]
pub struct ObservationTable {
    groups: Grouped,
    include_errors: bool,
    seed: u64,
    outliers: OutlierMethod,
    outlier_threshold: f64,
    injection: Option<TiktokSignal>,
}

impl ObservationTable {
    /// Number of objects.
    pub fn n_objects(&self) -> usize {
        self.groups.len()
    }

    /// Band names present for `object_id`.
    pub fn bands(&self, object_id: &str) -> Vec<BandId> {
        self.groups
            .get(object_id)
            .map(|b| b.keys().map(|k| BandId::new(k.clone())).collect())
            .unwrap_or_default()
    }

    /// Objects whose listed bands all have at least `min_points` finite
    /// observations before cleaning.
    pub fn objects_with_min_points(&self, bands: &[BandId], min_points: usize) -> Vec<String> {
        self.groups
            .iter()
            .filter(|(_, object)| {
                bands.iter().all(|band| {
                    object.get(band.as_str()).is_some_and(|raw| {
                        raw.time
                            .iter()
                            .zip(&raw.magnitude)
                            .filter(|(t, m)| t.is_finite() && m.is_finite())
                            .count()
                            >= min_points
                    })
                })
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn clean(&self, curve: LightCurve) -> LightCurve {
        match self.outliers {
            OutlierMethod::None => curve,
            OutlierMethod::Mad => curve.outliers_mad(self.outlier_threshold),
            OutlierMethod::ZScore => curve.outliers_zscore(self.outlier_threshold),
        }
    }
}

impl LightCurveSource for ObservationTable {
    fn object_ids(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    fn load(&self, object_id: &str) -> Result<ObjectLightCurves, DetectError> {
        let bands = self
            .groups
            .get(object_id)
            .ok_or_else(|| DetectError::ObjectNotFound {
                set_id: object_id.to_string(),
            })?;

        // Kept apart from the detection stream of the same object.
        let mut rng = StdRng::seed_from_u64(object_seed(self.seed.wrapping_add(1), object_id));
        let mut object = ObjectLightCurves::new(object_id);
        for (band, raw) in bands {
            let errors = (self.include_errors && !raw.errors.is_empty()).then(|| raw.errors.clone());
            let curve = self.clean(LightCurve::new(raw.time.clone(), raw.magnitude.clone(), errors)?);
            let curve = match &self.injection {
                Some(signal) => curve.inject_tiktok(signal).0,
                None => curve,
            };
            let curve = if curve.errors().is_some() {
                curve.perturbed(&mut rng)
            } else {
                curve
            };
            debug!(object_id, band = band.as_str(), n = curve.len(), "band loaded");
            object.insert(band.as_str(), curve);
        }
        Ok(object)
    }
}

/// Read an observation table from a Parquet file.
///
/// # Errors
///
/// Returns [`IoError::Validation`] for an invalid configuration or
/// unusable column types, [`IoError::FileNotFound`] or
/// [`IoError::MissingColumn`] for a missing file or column, and
/// [`IoError::Parquet`] / [`IoError::Arrow`] for decoding failures.
pub fn read_observations(path: &Path, config: &ReaderConfig) -> Result<ObservationTable, IoError> {
    config.validate()?;
    info!(path = %path.display(), "reading observation table");

    let batches = parquet_read::read_batches(path)?;
    let groups = match batches.first() {
        None => Grouped::new(),
        Some(first) => {
            let c = &config.columns;
            let error = parquet_read::column_index(first, &c.error, path).ok();
            if error.is_none() && config.include_errors {
                return Err(IoError::MissingColumn {
                    name: c.error.clone(),
                    path: path.to_path_buf(),
                });
            }
            let idx = ColumnIndices {
                object_id: parquet_read::column_index(first, &c.object_id, path)?,
                band: parquet_read::column_index(first, &c.band, path)?,
                time: parquet_read::column_index(first, &c.time, path)?,
                magnitude: parquet_read::column_index(first, &c.magnitude, path)?,
                error,
            };
            parquet_read::validate_schema(first, &idx)?;
            parquet_read::group_by_object_and_band(&batches, &idx, |v| config.band_name(v))?
        }
    };

    info!(
        n_objects = groups.len(),
        n_batches = batches.len(),
        "observation table loaded"
    );

    Ok(ObservationTable {
        groups,
        include_errors: config.include_errors,
        seed: config.seed,
        outliers: config.outliers,
        outlier_threshold: config.outlier_threshold,
        injection: config.injection.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = ReaderConfig::default();
        assert_eq!(config.columns().object_id, "objectId");
        assert_eq!(config.columns().error, "psMagErr");
        assert!(!config.include_errors());
        assert_eq!(config.outliers(), OutlierMethod::Mad);
        assert!(config.injection().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn band_aliases() {
        let config = ReaderConfig::default()
            .with_band_alias("1", "g")
            .with_band_alias("2", "r");
        assert_eq!(config.band_name("1"), "g");
        assert_eq!(config.band_name("2"), "r");
        assert_eq!(config.band_name("i"), "i");
    }

    #[test]
    fn outlier_method_parsing() {
        assert_eq!("MAD".parse::<OutlierMethod>().unwrap(), OutlierMethod::Mad);
        assert_eq!("z-score".parse::<OutlierMethod>().unwrap(), OutlierMethod::ZScore);
        assert_eq!("none".parse::<OutlierMethod>().unwrap(), OutlierMethod::None);
        assert!("iqr".parse::<OutlierMethod>().is_err());
        assert_eq!(OutlierMethod::ZScore.to_string(), "zscore");
    }

    #[test]
    fn validate_rejects_bad_threshold_and_empty_names() {
        let config = ReaderConfig::default()
            .with_outliers(OutlierMethod::Mad, 0.0)
            .with_columns(ColumnNames {
                time: String::new(),
                ..ColumnNames::default()
            });
        match config.validate().unwrap_err() {
            IoError::Validation { count, details } => {
                assert_eq!(count, 2);
                assert!(details.contains("outlier_threshold"));
                assert!(details.contains("time column"));
            }
            other => panic!("expected Validation error, got {other:?}"),
        }
    }
}
