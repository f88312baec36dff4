//! Cohort-component projection
//!
//! The driver owns a `CohortStateStore` and applies, once per simulated
//! year and in fixed order, mortality, immigration, domestic migration and
//! fertility with aging, then snapshots the population.

pub mod aging;
pub mod driver;
pub mod fertility;
pub mod immigration;
pub mod mortality;
pub mod state;

pub use aging::AgingStep;
pub use driver::{
    CancellationToken, DriverState, ProjectionDriver, ProjectionResult, ProjectionStage,
    YearSummary,
};
pub use fertility::{FertilityComponent, MALE_BIRTH_FRACTION};
pub use immigration::ImmigrationComponent;
pub use mortality::MortalityComponent;
pub use state::{CohortStateStore, ProjectionSnapshot, apply_delta};

use crate::config::ProjectionConfig;
use crate::error::{ProjectionError, Result};
use crate::inputs::RawInputs;
use crate::output::{ParquetSink, ProjectionSink};

/// Run one scenario from its configured inputs to Parquet output
///
/// # Arguments
/// * `scenario` - Configuration naming inputs, output and assumptions
/// * `launch_year` - Year of the baseline population
/// * `horizon_year` - Last simulated year
pub fn run(scenario: &ProjectionConfig, launch_year: i32, horizon_year: i32) -> Result<ProjectionResult> {
    let raw = RawInputs::load(&scenario.inputs)?;
    let mut sink = ParquetSink::new(&scenario.output);
    run_with_inputs(scenario, &raw, launch_year, horizon_year, &mut sink, CancellationToken::new())
}

/// Like `run`, reading the input tables concurrently
pub async fn run_async(
    scenario: &ProjectionConfig,
    launch_year: i32,
    horizon_year: i32,
    cancel: CancellationToken,
) -> Result<ProjectionResult> {
    let raw = RawInputs::load_async(&scenario.inputs).await?;
    let config = scenario.clone();
    tokio::task::spawn_blocking(move || {
        let mut sink = ParquetSink::new(&config.output);
        run_with_inputs(&config, &raw, launch_year, horizon_year, &mut sink, cancel)
    })
    .await?
}

/// Run one scenario over already loaded inputs
pub fn run_with_inputs(
    scenario: &ProjectionConfig,
    raw: &RawInputs,
    launch_year: i32,
    horizon_year: i32,
    sink: &mut dyn ProjectionSink,
    cancel: CancellationToken,
) -> Result<ProjectionResult> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(scenario.thread_count())
        .build()
        .map_err(|e| ProjectionError::Config(format!("thread pool: {e}")))?;
    pool.install(|| {
        ProjectionDriver::new(scenario.clone(), raw, launch_year, horizon_year)?
            .with_cancellation(cancel)
            .run(sink)
    })
}
