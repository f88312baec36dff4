//! IO utilities for file operations

pub mod parquet;

// Re-export commonly used functions for convenience
pub use parquet::{read_parquet, read_rows, rows_to_batch, write_batches, write_rows};
