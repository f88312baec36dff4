//! Error handling for the projection engine.
//!
//! Every integrity violation is fail-fast. Variants raised inside the
//! simulation loop carry the simulated year so the process can report which
//! invariant broke and when.

use std::io;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

pub mod util;

/// Specialized error type for projection runs
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    /// A cohort required by the full key cross is absent from the baseline
    #[error("missing baseline population for {key} in launch year {year}")]
    MissingBaseline { year: i32, key: String },

    /// A cohort or adjustment key has no rate in an external rate table
    #[error("missing {table} entry for {key} in year {year}")]
    MissingRate {
        table: &'static str,
        key: String,
        year: i32,
    },

    /// Immigration allocation fractions do not sum to one
    #[error("immigration fractions for year {year} sum to {sum}, expected 1 within {tolerance}")]
    FractionIntegrity { year: i32, sum: f64, tolerance: f64 },

    /// A (model, race, age group) key is absent from the coefficient set
    #[error("no migration coefficients for model '{model}', race {race}, age group {age_group}")]
    CoefficientLookup {
        model: String,
        race: String,
        age_group: String,
    },

    /// Logarithm or ratio taken over a non-positive spatial quantity
    ///
    /// `year` is unset when the value is rejected while loading inputs.
    #[error(
        "{variable} = {value} is outside the log domain for pair {origin} -> {destination}{}",
        .year.map(|y| format!(" in year {y}")).unwrap_or_default()
    )]
    ArithmeticDomain {
        variable: &'static str,
        value: f64,
        origin: String,
        destination: String,
        year: Option<i32>,
    },

    /// Model output cannot be calibrated against the observed baseline
    #[error("cannot calibrate migration in year {year}: {reason}")]
    Calibration { year: i32, reason: String },

    /// Distance or classification data missing for a county pair
    #[error("missing spatial data for pair {origin} -> {destination}")]
    MissingSpatialData { origin: String, destination: String },

    /// Population balance identity failed for a simulated year
    #[error("population balance off by {difference} in year {year}")]
    Accounting { year: i32, difference: f64 },

    /// Malformed input table contents
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Cancellation requested at a year boundary
    #[error("projection cancelled before year {year}")]
    Cancelled { year: i32 },

    /// Error opening, reading or writing a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error building or slicing Arrow data
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error reading or writing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error converting between rows and record batches, or JSON
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A background loading task failed to join
    #[error("Task error: {0}")]
    Task(String),
}

impl ProjectionError {
    /// The simulated year attached to the error, if any
    #[must_use]
    pub const fn year(&self) -> Option<i32> {
        match self {
            Self::MissingBaseline { year, .. }
            | Self::MissingRate { year, .. }
            | Self::FractionIntegrity { year, .. }
            | Self::Accounting { year, .. }
            | Self::Calibration { year, .. }
            | Self::Cancelled { year } => Some(*year),
            Self::ArithmeticDomain { year, .. } => *year,
            _ => None,
        }
    }

    /// Whether this error halts a run because input data broke an invariant
    #[must_use]
    pub const fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            Self::MissingBaseline { .. }
                | Self::MissingRate { .. }
                | Self::FractionIntegrity { .. }
                | Self::CoefficientLookup { .. }
                | Self::ArithmeticDomain { .. }
                | Self::MissingSpatialData { .. }
                | Self::Accounting { .. }
                | Self::Calibration { .. }
        )
    }

    /// Attach the simulated year to an error raised without one
    #[must_use]
    pub fn in_year(self, simulated: i32) -> Self {
        match self {
            Self::ArithmeticDomain {
                variable,
                value,
                origin,
                destination,
                year: None,
            } => Self::ArithmeticDomain {
                variable,
                value,
                origin,
                destination,
                year: Some(simulated),
            },
            other => other,
        }
    }
}

impl From<serde_arrow::Error> for ProjectionError {
    fn from(error: serde_arrow::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<serde_json::Error> for ProjectionError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<tokio::task::JoinError> for ProjectionError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::Task(error.to_string())
    }
}

/// Result type for projection operations
pub type Result<T> = std::result::Result<T, ProjectionError>;
