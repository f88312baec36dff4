//! Shared utilities: Parquet IO, logging and progress reporting.

pub mod io;
pub mod logging;
