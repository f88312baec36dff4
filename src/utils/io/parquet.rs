//! Parquet file operations
//!
//! Reading external input tables into Arrow record batches and typed rows,
//! and writing result tables back out.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::datatypes::{FieldRef, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_arrow::schema::{SchemaLike, TracingOptions};

use crate::error::util::{ensure_directory, safe_open_file};
use crate::error::{ProjectionError, Result};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Default batch size for Parquet reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Helper function to get batch size from environment
#[must_use]
pub fn get_batch_size() -> Option<usize> {
    std::env::var("PARQUET_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
}

/// Read a parquet file into Arrow record batches
///
/// # Arguments
/// * `path` - Path to the Parquet file
/// * `purpose` - Which input table the file holds (for error context)
pub fn read_parquet(path: &Path, purpose: &str) -> Result<Vec<RecordBatch>> {
    let start = std::time::Instant::now();
    log_operation_start("Reading parquet file", path);

    let file = safe_open_file(path, purpose)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
        .with_batch_size(get_batch_size().unwrap_or(DEFAULT_BATCH_SIZE))
        .build()?;

    let batches = reader.collect::<std::result::Result<Vec<RecordBatch>, _>>()?;

    log_operation_complete("read", path, batches.len(), Some(start.elapsed()));
    Ok(batches)
}

/// Deserialize every row of a record batch with `serde_arrow`
pub fn rows_from_batch<T: DeserializeOwned>(batch: &RecordBatch) -> Result<Vec<T>> {
    serde_arrow::from_record_batch(batch).map_err(Into::into)
}

/// Read a parquet file and deserialize its rows
pub fn read_rows<T: DeserializeOwned>(path: &Path, purpose: &str) -> Result<Vec<T>> {
    let batches = read_parquet(path, purpose)?;
    let mut rows = Vec::with_capacity(batches.iter().map(RecordBatch::num_rows).sum());
    for batch in &batches {
        rows.extend(rows_from_batch::<T>(batch).map_err(|e| {
            ProjectionError::Serialization(format!("{purpose} ({}): {e}", path.display()))
        })?);
    }
    Ok(rows)
}

/// Arrow fields for a row type, traced from the type itself
pub fn fields_for<'de, T: Serialize + serde::Deserialize<'de>>() -> Result<Vec<FieldRef>> {
    Vec::<FieldRef>::from_type::<T>(TracingOptions::default().allow_null_fields(true))
        .map_err(Into::into)
}

/// Serialize rows into a record batch
pub fn rows_to_batch<T>(rows: &[T]) -> Result<RecordBatch>
where
    T: Serialize + for<'de> serde::Deserialize<'de>,
{
    let fields = fields_for::<T>()?;
    serde_arrow::to_record_batch(&fields, &rows).map_err(Into::into)
}

/// Write record batches to a parquet file, replacing any existing file
pub fn write_batches(path: &Path, schema: Arc<Schema>, batches: &[RecordBatch]) -> Result<()> {
    let start = std::time::Instant::now();
    log_operation_start("Writing parquet file", path);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_directory(parent, "parquet output")?;
    }

    let file = File::create(path)?;
    let properties = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(properties))?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.close()?;

    log_operation_complete("wrote", path, batches.len(), Some(start.elapsed()));
    Ok(())
}

/// Serialize rows and write them to a parquet file
pub fn write_rows<T>(path: &Path, rows: &[T]) -> Result<()>
where
    T: Serialize + for<'de> serde::Deserialize<'de>,
{
    let batch = rows_to_batch(rows)?;
    write_batches(path, batch.schema(), &[batch])
}
