//! Utility functions for error handling
//!
//! File-system helpers that attach the path and the reason a file was needed
//! to the resulting error.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{ProjectionError, Result};

fn io_error(kind: io::ErrorKind, message: String) -> ProjectionError {
    ProjectionError::Io(io::Error::new(kind, message))
}

/// Safely open a file with rich error information
///
/// # Arguments
/// * `path` - The path to the file to open
/// * `purpose` - Why the file is being opened (for error context)
pub fn safe_open_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if !path.exists() {
        return Err(io_error(
            io::ErrorKind::NotFound,
            format!("File not found: {} (needed for {purpose})", path.display()),
        ));
    }

    if !path.is_file() {
        return Err(io_error(
            io::ErrorKind::InvalidInput,
            format!("Path is not a file: {} (expected for {purpose})", path.display()),
        ));
    }

    fs::File::open(path).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::PermissionDenied => "Permission denied - check file permissions",
            _ => "Failed to open file",
        };
        io_error(
            e.kind(),
            format!("{context}: {} (needed for {purpose}): {e}", path.display()),
        )
    })
}

/// Check if a directory exists and is readable
pub fn validate_directory(path: &Path, purpose: &str) -> Result<()> {
    if !path.is_dir() {
        return Err(io_error(
            io::ErrorKind::NotFound,
            format!("Directory not found: {} (needed for {purpose})", path.display()),
        ));
    }

    fs::read_dir(path).map(|_| ()).map_err(|e| {
        io_error(
            e.kind(),
            format!("Failed to access directory {} for {purpose}: {e}", path.display()),
        )
    })
}

/// Create a directory (and parents) for writing outputs
pub fn ensure_directory(path: &Path, purpose: &str) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| {
        io_error(
            e.kind(),
            format!("Failed to create directory {} for {purpose}: {e}", path.display()),
        )
    })
}

/// Safely read a file to string with rich error information
pub fn safe_read_to_string(path: &Path, purpose: &str) -> Result<String> {
    let mut file = safe_open_file(path, purpose)?;

    let mut content = String::new();
    io::Read::read_to_string(&mut file, &mut content).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::InvalidData => "File contains invalid UTF-8 data",
            _ => "Failed to read file content",
        };
        io_error(
            e.kind(),
            format!("{context}: {} (needed for {purpose})", path.display()),
        )
    })?;
    Ok(content)
}
