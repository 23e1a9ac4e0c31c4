//! Low-level Parquet reading and column extraction.

use std::collections::BTreeMap;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray, RecordBatch};
use arrow::compute::{can_cast_types, cast};
use arrow::datatypes::{DataType, Float64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::IoError;

/// Observations of one object in one band, as stored in the table.
#[derive(Debug, Default, Clone)]
pub(crate) struct RawBand {
    pub time: Vec<f64>,
    pub magnitude: Vec<f64>,
    /// Empty when the table has no error column.
    pub errors: Vec<f64>,
}

/// Raw observations keyed by object, then by (mapped) band name.
pub(crate) type Grouped = BTreeMap<String, BTreeMap<String, RawBand>>;

/// Positions of the observation columns in the file schema.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ColumnIndices {
    pub object_id: usize,
    pub band: usize,
    pub time: usize,
    pub magnitude: usize,
    pub error: Option<usize>,
}

/// Reads all record batches from a Parquet file.
///
/// # Errors
///
/// Returns [`IoError::FileNotFound`] if the file does not exist, or
/// [`IoError::Parquet`] if the file cannot be opened or read.
pub(crate) fn read_batches(path: &Path) -> Result<Vec<RecordBatch>, IoError> {
    if !path.exists() {
        return Err(IoError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let file = std::fs::File::open(path).map_err(|e| IoError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let reader = builder.build()?;

    let batches: Vec<RecordBatch> = reader.collect::<Result<Vec<_>, _>>()?;
    Ok(batches)
}

/// Index of column `name` in the batch schema.
pub(crate) fn column_index(batch: &RecordBatch, name: &str, path: &Path) -> Result<usize, IoError> {
    batch
        .schema()
        .index_of(name)
        .map_err(|_| IoError::MissingColumn {
            name: name.to_string(),
            path: path.to_path_buf(),
        })
}

/// Checks that every column can be read as the type the grouping needs.
///
/// Identifier and band columns may be strings or integers; the numeric
/// columns may be any numeric type.
pub(crate) fn validate_schema(batch: &RecordBatch, idx: &ColumnIndices) -> Result<(), IoError> {
    let schema = batch.schema();
    let mut problems = Vec::new();

    for i in [idx.object_id, idx.band] {
        let field = schema.field(i);
        if !can_cast_types(field.data_type(), &DataType::Utf8) {
            problems.push(format!("'{}' cannot be read as text", field.name()));
        }
    }
    for i in [Some(idx.time), Some(idx.magnitude), idx.error].into_iter().flatten() {
        let field = schema.field(i);
        if !field.data_type().is_numeric() {
            problems.push(format!(
                "'{}' is {}, expected a numeric type",
                field.name(),
                field.data_type()
            ));
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

fn as_utf8(column: &ArrayRef) -> Result<ArrayRef, IoError> {
    Ok(cast(column, &DataType::Utf8)?)
}

fn as_f64(column: &ArrayRef) -> Result<ArrayRef, IoError> {
    Ok(cast(column, &DataType::Float64)?)
}

/// Groups observations by object and band.
///
/// Rows with a null identifier or band are dropped; null measurements
/// become NaN and are removed later with the other non-finite values.
/// `band_name` maps the stored band value to the band identifier.
pub(crate) fn group_by_object_and_band<F>(
    batches: &[RecordBatch],
    idx: &ColumnIndices,
    band_name: F,
) -> Result<Grouped, IoError>
where
    F: Fn(&str) -> String,
{
    let mut groups = Grouped::new();

    for batch in batches {
        let ids = as_utf8(batch.column(idx.object_id))?;
        let bands = as_utf8(batch.column(idx.band))?;
        let time = as_f64(batch.column(idx.time))?;
        let magnitude = as_f64(batch.column(idx.magnitude))?;
        let errors = idx.error.map(|i| as_f64(batch.column(i))).transpose()?;

        let ids = ids.as_string::<i32>();
        let bands = bands.as_string::<i32>();
        let time = time.as_primitive::<Float64Type>();
        let magnitude = magnitude.as_primitive::<Float64Type>();
        let errors = errors.as_ref().map(|e| e.as_primitive::<Float64Type>());

        let value = |col: &arrow::array::Float64Array, row: usize| {
            if col.is_null(row) { f64::NAN } else { col.value(row) }
        };

        for row in 0..batch.num_rows() {
            if ids.is_null(row) || bands.is_null(row) {
                continue;
            }
            let entry = groups
                .entry(ids.value(row).to_string())
                .or_default()
                .entry(band_name(bands.value(row)))
                .or_default();
            entry.time.push(value(time, row));
            entry.magnitude.push(value(magnitude, row));
            if let Some(errors) = errors {
                entry.errors.push(value(errors, row));
            }
        }
    }

    Ok(groups)
}
