//! Low-level Parquet column building.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use qhx_detect::{CommonPeriodRecord, ObjectLightCurves};

use crate::error::IoError;
use crate::reader::ColumnNames;

/// Column names of the period-record output, in order.
pub(crate) const RECORD_COLUMNS: [&str; 8] = [
    "objectid",
    "sampling_i",
    "sampling_j",
    "period",
    "upper_error",
    "lower_error",
    "significance",
    "label",
];

/// Builds the Arrow schema for period records.
///
/// Measured fields are non-nullable; a missing detection is NaN, not null.
pub(crate) fn record_schema() -> Schema {
    let fields: Vec<Field> = RECORD_COLUMNS
        .iter()
        .map(|&name| match name {
            "objectid" | "label" => Field::new(name, DataType::Utf8, false),
            _ => Field::new(name, DataType::Float64, false),
        })
        .collect();
    Schema::new(fields)
}

/// Converts period records into one Arrow [`RecordBatch`].
pub(crate) fn records_to_record_batch(
    records: &[CommonPeriodRecord],
    schema: &Schema,
) -> Result<RecordBatch, IoError> {
    let floats = |f: fn(&CommonPeriodRecord) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from_iter_values(records.iter().map(f)))
    };
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.object_id.as_str()),
        )),
        floats(|r| r.sampling_i),
        floats(|r| r.sampling_j),
        floats(|r| r.period),
        floats(|r| r.upper_error),
        floats(|r| r.lower_error),
        floats(|r| r.significance),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.label.as_str()),
        )),
    ];
    Ok(RecordBatch::try_new(Arc::new(schema.clone()), columns)?)
}

/// Builds the Arrow schema of an observation table.
///
/// The error column is nullable: bands without errors store nulls.
pub(crate) fn observation_schema(names: &ColumnNames) -> Schema {
    Schema::new(vec![
        Field::new(&names.object_id, DataType::Utf8, false),
        Field::new(&names.band, DataType::Utf8, false),
        Field::new(&names.time, DataType::Float64, false),
        Field::new(&names.magnitude, DataType::Float64, false),
        Field::new(&names.error, DataType::Float64, true),
    ])
}

/// Converts one object's light curves into a [`RecordBatch`], one row per
/// observation, bands in ascending order.
pub(crate) fn object_to_record_batch(
    object: &ObjectLightCurves,
    schema: &Schema,
) -> Result<RecordBatch, IoError> {
    let mut ids = Vec::new();
    let mut bands = Vec::new();
    let mut time = Vec::new();
    let mut magnitude = Vec::new();
    let mut errors: Vec<Option<f64>> = Vec::new();

    for band in object.band_ids() {
        let Some(curve) = object.band(band) else { continue };
        for i in 0..curve.len() {
            ids.push(object.object_id());
            bands.push(band.as_str());
            time.push(curve.time()[i]);
            magnitude.push(curve.magnitude()[i]);
            errors.push(curve.errors().map(|e| e[i]));
        }
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(StringArray::from(bands)),
        Arc::new(Float64Array::from(time)),
        Arc::new(Float64Array::from(magnitude)),
        Arc::new(Float64Array::from(errors)),
    ];
    Ok(RecordBatch::try_new(Arc::new(schema.clone()), columns)?)
}

/// Writes a sequence of [`RecordBatch`]es to a Parquet file at `path`.
///
/// # Errors
///
/// Returns [`IoError::Io`] if the file cannot be created and
/// [`IoError::Parquet`] if batch writing or file finalisation fails.
pub(crate) fn write_batches(
    path: &Path,
    batches: &[RecordBatch],
    schema: &Schema,
    props: WriterProperties,
) -> Result<(), IoError> {
    let file = std::fs::File::create(path).map_err(|e| IoError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut writer = ArrowWriter::try_new(file, Arc::new(schema.clone()), Some(props))?;

    for batch in batches {
        writer.write(batch)?;
    }

    writer.close()?;
    Ok(())
}
