//! Logging utilities
//!
//! Standardized log lines for file operations and projection stages.

use std::path::Path;

/// Log an operation start with consistent format
///
/// # Arguments
/// * `operation` - Description of the operation
/// * `path` - Path of the file or directory being operated on
pub fn log_operation_start(operation: &str, path: &Path) {
    log::debug!("{} {}", operation, path.display());
}

/// Log an operation completion with consistent format
///
/// # Arguments
/// * `operation` - Description of the operation
/// * `path` - Path of the file or directory that was operated on
/// * `items` - Number of items processed
/// * `elapsed` - Optional elapsed time
pub fn log_operation_complete(
    operation: &str,
    path: &Path,
    items: usize,
    elapsed: Option<std::time::Duration>,
) {
    if let Some(duration) = elapsed {
        log::debug!(
            "Successfully {} {} batches at {} in {:?}",
            operation,
            items,
            path.display(),
            duration
        );
    } else {
        log::debug!(
            "Successfully {} {} batches at {}",
            operation,
            items,
            path.display()
        );
    }
}

/// Log the population total after a projection stage
pub fn log_stage_totals(year: i32, stage: &str, change: f64, population: f64) {
    log::debug!("[{year}] {stage:<12} change {change:>14.1}  population {population:>16.1}");
}
