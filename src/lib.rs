//! Cohort-component projection of US county populations.
//!
//! Each simulated year applies mortality, net international immigration,
//! gravity-model domestic migration and fertility with aging to a dense
//! (county, age group, race, sex) population table, then snapshots it.
//! Inputs and outputs are Parquet files.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod inputs;
pub mod models;
pub mod output;
pub mod synthetic;
pub mod utils;

// Running projections
pub use algorithm::projection::{
    CancellationToken, ProjectionDriver, ProjectionResult, YearSummary, run, run_async,
    run_with_inputs,
};

// Migration model
pub use algorithm::migration::{MigrationEngine, SpatialVariableCalculator};

// Configuration and errors
pub use config::{ClippingPolicy, InterveningOpportunities, OutputLayout, ProjectionConfig};
pub use error::{ProjectionError, Result};

// Data model
pub use inputs::{ProjectionInputs, RawInputs};
pub use models::cohort::{AgeGroup, Category, CohortKey, GeoId, Race, Sex};
pub use models::space::CohortSpace;
pub use models::table::CohortTable;

// Output
pub use output::{MemorySink, OutputComponent, ParquetSink, ProjectionSink};
pub use synthetic::SyntheticWorld;
