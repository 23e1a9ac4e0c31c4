//! # qhx-io
//!
//! Read multi-band observation tables from Parquet and write detected
//! periods to Parquet or CSV. Bridges external files into the
//! [`LightCurveSource`](qhx_detect::LightCurveSource) contract of
//! `qhx-detect`.

mod error;
mod parquet_read;
mod parquet_write;
mod reader;
mod writer;

pub use error::IoError;
pub use reader::{ColumnNames, ObservationTable, OutlierMethod, ReaderConfig, read_observations};
pub use writer::{
    Compression, WriterConfig, write_observations_parquet, write_records_csv,
    write_records_parquet,
};
