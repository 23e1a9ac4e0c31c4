//! High-level writer configuration and orchestration.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use parquet::file::properties::WriterProperties;
use qhx_detect::{CommonPeriodRecord, ObjectLightCurves};
use tracing::info;

use crate::error::IoError;
use crate::parquet_write;
use crate::reader::ColumnNames;

/// Compression algorithm for Parquet output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    /// No compression.
    None,
    /// Snappy compression (fast, moderate ratio).
    #[default]
    Snappy,
    /// Zstd compression (slower, better ratio).
    Zstd,
}

impl Compression {
    /// Converts to the corresponding `parquet::basic::Compression` variant.
    fn to_parquet(self) -> Result<parquet::basic::Compression, IoError> {
        Ok(match self {
            Self::None => parquet::basic::Compression::UNCOMPRESSED,
            Self::Snappy => parquet::basic::Compression::SNAPPY,
            Self::Zstd => {
                let level = parquet::basic::ZstdLevel::try_new(3)?;
                parquet::basic::Compression::ZSTD(level)
            }
        })
    }
}

impl std::str::FromStr for Compression {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "uncompressed" => Ok(Self::None),
            "snappy" => Ok(Self::Snappy),
            "zstd" => Ok(Self::Zstd),
            other => Err(IoError::Validation {
                count: 1,
                details: format!("unknown compression '{other}' (expected none, snappy or zstd)"),
            }),
        }
    }
}

/// Configuration for Parquet output.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Compression algorithm to use.
    compression: Compression,
    /// Maximum number of rows per row group.
    row_group_size: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
            row_group_size: 1_000_000,
        }
    }
}

impl WriterConfig {
    /// Sets the compression algorithm.
    pub fn with_compression(mut self, comp: Compression) -> Self {
        self.compression = comp;
        self
    }

    /// Sets the maximum number of rows per row group.
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Validates this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Validation`] if `row_group_size` is zero.
    fn validate(&self) -> Result<(), IoError> {
        if self.row_group_size == 0 {
            return Err(IoError::Validation {
                count: 1,
                details: "row_group_size must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    fn properties(&self) -> Result<WriterProperties, IoError> {
        self.validate()?;
        Ok(WriterProperties::builder()
            .set_compression(self.compression.to_parquet()?)
            .set_max_row_group_size(self.row_group_size)
            .build())
    }
}

/// Write period records to a Parquet file.
///
/// Null records keep NaN in their measured columns.
///
/// # Errors
///
/// Returns [`IoError::Validation`] if the configuration is invalid, or
/// [`IoError::Io`] / [`IoError::Parquet`] / [`IoError::Arrow`] if batch
/// conversion or file I/O fails.
pub fn write_records_parquet(
    path: &Path,
    records: &[CommonPeriodRecord],
    config: &WriterConfig,
) -> Result<(), IoError> {
    let props = config.properties()?;
    let schema = parquet_write::record_schema();
    let batch = parquet_write::records_to_record_batch(records, &schema)?;
    parquet_write::write_batches(path, &[batch], &schema, props)?;
    info!(path = %path.display(), n_records = records.len(), "period records written");
    Ok(())
}

fn csv_float(v: f64) -> String {
    if v.is_nan() { "NaN".to_string() } else { v.to_string() }
}

fn csv_text(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Write period records as CSV with a header row.
///
/// NaN is written as the literal token `NaN` so null records survive a
/// round trip through spreadsheet and dataframe tools.
///
/// # Errors
///
/// Returns [`IoError::Io`] if the file cannot be created or written.
pub fn write_records_csv(path: &Path, records: &[CommonPeriodRecord]) -> Result<(), IoError> {
    let io_err = |e: std::io::Error| IoError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    let file = File::create(path).map_err(io_err)?;
    let mut out = BufWriter::new(file);

    writeln!(out, "{}", parquet_write::RECORD_COLUMNS.join(",")).map_err(io_err)?;
    for r in records {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            csv_text(&r.object_id),
            csv_float(r.sampling_i),
            csv_float(r.sampling_j),
            csv_float(r.period),
            csv_float(r.upper_error),
            csv_float(r.lower_error),
            csv_float(r.significance),
            csv_text(&r.label),
        )
        .map_err(io_err)?;
    }
    out.flush().map_err(io_err)?;
    info!(path = %path.display(), n_records = records.len(), "period records written");
    Ok(())
}

/// Write light curves as an observation table readable by
/// [`read_observations`](crate::read_observations).
///
/// # Errors
///
/// As [`write_records_parquet`].
pub fn write_observations_parquet(
    path: &Path,
    objects: &[ObjectLightCurves],
    columns: &ColumnNames,
    config: &WriterConfig,
) -> Result<(), IoError> {
    let props = config.properties()?;
    let schema = parquet_write::observation_schema(columns);
    let batches = objects
        .iter()
        .map(|o| parquet_write::object_to_record_batch(o, &schema))
        .collect::<Result<Vec<_>, _>>()?;
    parquet_write::write_batches(path, &batches, &schema, props)?;
    info!(path = %path.display(), n_objects = objects.len(), "observations written");
    Ok(())
}
