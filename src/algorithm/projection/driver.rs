//! Year-by-year projection driver
//!
//! Every simulated year passes through the same fixed stages:
//! Mortality -> Immigration -> Migration -> Fertility + Aging -> Snapshot.
//! There are no skip or retry transitions; any error halts the run and
//! carries the offending year. Cancellation is checked at year boundaries.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::algorithm::migration::MigrationEngine;
use crate::algorithm::projection::aging::AgingStep;
use crate::algorithm::projection::fertility::FertilityComponent;
use crate::algorithm::projection::immigration::ImmigrationComponent;
use crate::algorithm::projection::mortality::MortalityComponent;
use crate::algorithm::projection::state::{CohortStateStore, ProjectionSnapshot};
use crate::config::ProjectionConfig;
use crate::error::{ProjectionError, Result};
use crate::inputs::{ProjectionInputs, RawInputs};
use crate::models::table::{ClipReport, CohortTable, DeltaOp};
use crate::output::{OutputComponent, ProjectionSink, RunInfo, YearTables};
use crate::utils::logging::{create_year_progress_bar, finish_progress_bar, log_stage_totals};

/// Cooperative cancellation flag, checked before each simulated year
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Stages of one simulated year, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectionStage {
    Mortality,
    Immigration,
    Migration,
    FertilityAging,
    Snapshot,
}

impl ProjectionStage {
    pub const FIRST: Self = Self::Mortality;

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mortality => "mortality",
            Self::Immigration => "immigration",
            Self::Migration => "migration",
            Self::FertilityAging => "fertility+aging",
            Self::Snapshot => "snapshot",
        }
    }

    /// The stage that follows, `None` after the snapshot
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Mortality => Some(Self::Immigration),
            Self::Immigration => Some(Self::Migration),
            Self::Migration => Some(Self::FertilityAging),
            Self::FertilityAging => Some(Self::Snapshot),
            Self::Snapshot => None,
        }
    }
}

/// Where the driver is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Waiting to simulate `year`
    Ready { year: i32 },
    /// Inside `stage` of `year`
    Running { year: i32, stage: ProjectionStage },
    /// The horizon year has been snapshotted
    Finished,
}

/// Population accounting of one simulated year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    pub year: i32,
    pub start_population: f64,
    pub deaths: f64,
    pub net_immigration: f64,
    pub net_migration: f64,
    pub gross_migration: f64,
    pub births: f64,
    /// Mass restored by end-of-year clipping (zero under per-stage clipping)
    pub end_of_year_clipping: f64,
    /// Cells clipped at any point during the year
    pub clipped_cells: usize,
    pub end_population: f64,
}

impl YearSummary {
    /// Deviation from the demographic balance identity
    #[must_use]
    pub fn balance_error(&self) -> f64 {
        self.end_population
            - (self.start_population - self.deaths
                + self.net_immigration
                + self.net_migration
                + self.births
                + self.end_of_year_clipping)
    }
}

/// Output of a completed run
#[derive(Debug, Clone)]
pub struct ProjectionResult {
    pub scenario: String,
    pub launch_year: i32,
    pub horizon_year: i32,
    pub summaries: Vec<YearSummary>,
    /// Yearly populations, launch year first (only the last one when
    /// snapshots are not retained)
    pub snapshots: Vec<ProjectionSnapshot>,
    pub final_population: CohortTable,
}

impl ProjectionResult {
    /// Snapshot of one year, if retained
    #[must_use]
    pub fn snapshot(&self, year: i32) -> Option<&ProjectionSnapshot> {
        self.snapshots.iter().find(|s| s.year == year)
    }
}

/// Runs one scenario from the launch year to the horizon year
#[derive(Debug)]
pub struct ProjectionDriver {
    config: ProjectionConfig,
    inputs: ProjectionInputs,
    store: CohortStateStore,
    migration: MigrationEngine,
    cancel: CancellationToken,
    launch_year: i32,
    horizon_year: i32,
    state: DriverState,
    summaries: Vec<YearSummary>,
}

impl ProjectionDriver {
    /// Validate the configuration and build every component from raw inputs
    pub fn new(
        config: ProjectionConfig,
        raw: &RawInputs,
        launch_year: i32,
        horizon_year: i32,
    ) -> Result<Self> {
        config.validate()?;
        config.validate_years(launch_year, horizon_year)?;

        let store = CohortStateStore::load(&raw.baseline, launch_year, config.clipping)?
            .with_retained_snapshots(config.retain_snapshots);
        let inputs = ProjectionInputs::assemble(raw, store.space(), &config)?;

        let mut migration = MigrationEngine::new(
            config.scenario.model_name.clone(),
            Arc::clone(&inputs.coefficients),
            inputs.age_weights.clone(),
            Arc::clone(&inputs.distances),
            &config.migration,
        );
        if let Some(observed) = inputs.migration_baseline.clone() {
            migration = migration.with_calibration(observed);
        }

        Ok(Self {
            config,
            inputs,
            store,
            migration,
            cancel: CancellationToken::new(),
            launch_year,
            horizon_year,
            state: DriverState::Ready {
                year: launch_year + 1,
            },
            summaries: Vec::new(),
        })
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    #[must_use]
    pub const fn state(&self) -> DriverState {
        self.state
    }

    #[must_use]
    pub fn current_population(&self) -> &CohortTable {
        self.store.current()
    }

    #[must_use]
    pub fn summaries(&self) -> &[YearSummary] {
        &self.summaries
    }

    fn run_info(&self) -> RunInfo {
        RunInfo {
            scenario: self.config.scenario.name.clone(),
            model_name: self.config.scenario.model_name.clone(),
            launch_year: self.launch_year,
            horizon_year: self.horizon_year,
            space: Arc::clone(self.store.space()),
        }
    }

    fn enter(&mut self, year: i32, stage: ProjectionStage) {
        debug!("[{year}] entering {}", stage.name());
        self.state = DriverState::Running { year, stage };
    }

    /// Snapshot the launch-year population and announce the run to the sink
    pub fn start(&mut self, sink: &mut dyn ProjectionSink) -> Result<()> {
        sink.begin(&self.run_info())?;
        let snapshot = self.store.snapshot(self.launch_year);
        let mut tables = YearTables::new(self.launch_year);
        tables.push(OutputComponent::Population, snapshot.population.clone());
        sink.record(&tables)
    }

    /// Simulate the next year, `None` once the horizon has been reached
    pub fn step(&mut self, sink: &mut dyn ProjectionSink) -> Result<Option<YearSummary>> {
        let DriverState::Ready { year } = self.state else {
            return Ok(None);
        };
        if self.cancel.is_cancelled() {
            return Err(ProjectionError::Cancelled { year });
        }

        let start = Instant::now();
        let start_population = self.store.current().total();
        let mut clipped = ClipReport::default();

        let mut stage = ProjectionStage::FIRST;
        let mut tables = YearTables::new(year);
        let mut deaths = 0.0;
        let mut net_immigration = 0.0;
        let mut net_migration = 0.0;
        let mut gross_migration = 0.0;
        let mut births = 0.0;
        let mut end_of_year_clipping = 0.0;

        loop {
            self.enter(year, stage);
            match stage {
                ProjectionStage::Mortality => {
                    let delta = MortalityComponent::new(
                        &self.inputs.mortality_rates,
                        &self.inputs.mortality_multipliers,
                    )
                    .deaths(year, self.store.current())?;
                    let applied = self.store.apply_delta(&delta, DeltaOp::Subtract, year, stage.name())?;
                    clipped.merge(applied.clipped);
                    deaths = applied.applied.total();
                    log_stage_totals(year, stage.name(), -deaths, self.store.current().total());
                    tables.push(OutputComponent::Deaths, applied.applied);
                }
                ProjectionStage::Immigration => {
                    let delta = ImmigrationComponent::new(
                        self.config.scenario.national_net_immigration,
                        &self.inputs.immigration_fractions,
                        &self.inputs.immigration_multipliers,
                        self.config.fraction_tolerance,
                    )
                    .immigrants(year, self.store.space())?;
                    let applied = self.store.apply_delta(&delta, DeltaOp::Add, year, stage.name())?;
                    clipped.merge(applied.clipped);
                    net_immigration = applied.applied.total();
                    log_stage_totals(year, stage.name(), net_immigration, self.store.current().total());
                    tables.push(OutputComponent::NetImmigration, applied.applied);
                }
                ProjectionStage::Migration => {
                    let outcome = self.migration.project(year, self.store.current())?;
                    let applied = self.store.apply_delta(&outcome.net, DeltaOp::Add, year, stage.name())?;
                    clipped.merge(applied.clipped);
                    net_migration = applied.applied.total();
                    gross_migration = outcome.gross_total();
                    log_stage_totals(year, stage.name(), net_migration, self.store.current().total());
                    tables.push(OutputComponent::NetMigration, applied.applied);
                    tables.push(OutputComponent::Inmigration, outcome.inmigration);
                    tables.push(OutputComponent::Outmigration, outcome.outmigration);
                }
                ProjectionStage::FertilityAging => {
                    let newborns = FertilityComponent::new(
                        &self.inputs.fertility_rates,
                        &self.inputs.fertility_multipliers,
                    )
                    .births(year, self.store.current())?;
                    let aging = AgingStep.delta(self.store.current());
                    let aged = self.store.apply_delta(&aging, DeltaOp::Add, year, "aging")?;
                    clipped.merge(aged.clipped);
                    let applied = self.store.apply_delta(&newborns, DeltaOp::Add, year, stage.name())?;
                    clipped.merge(applied.clipped);
                    births = applied.applied.total();
                    log_stage_totals(year, stage.name(), births, self.store.current().total());
                    tables.push(OutputComponent::Births, applied.applied);
                }
                ProjectionStage::Snapshot => {
                    let report = self.store.finish_year(year);
                    end_of_year_clipping = report.mass;
                    clipped.merge(report);
                    let snapshot = self.store.snapshot(year);
                    tables.push(OutputComponent::Population, snapshot.population.clone());
                    sink.record(&tables)?;
                }
            }
            match stage.next() {
                Some(next) => stage = next,
                None => break,
            }
        }

        let summary = YearSummary {
            year,
            start_population,
            deaths,
            net_immigration,
            net_migration,
            gross_migration,
            births,
            end_of_year_clipping,
            clipped_cells: clipped.cells,
            end_population: self.store.current().total(),
        };

        let difference = summary.balance_error();
        if difference.abs() >= self.config.balance_tolerance {
            return Err(ProjectionError::Accounting { year, difference });
        }
        info!(
            "[{year}] population {:.0} (deaths {:.0}, immigration {:.0}, migration {:.1}, births {:.0}) in {:?}",
            summary.end_population,
            summary.deaths,
            summary.net_immigration,
            summary.net_migration,
            summary.births,
            start.elapsed()
        );

        self.state = if year >= self.horizon_year {
            DriverState::Finished
        } else {
            DriverState::Ready { year: year + 1 }
        };
        self.summaries.push(summary.clone());
        Ok(Some(summary))
    }

    /// Run every remaining year and finish the sink
    pub fn run(mut self, sink: &mut dyn ProjectionSink) -> Result<ProjectionResult> {
        info!(
            "Projecting scenario '{}' from {} to {}",
            self.config.scenario.name, self.launch_year, self.horizon_year
        );
        let start = Instant::now();
        let years = u64::try_from(self.horizon_year - self.launch_year).unwrap_or(0);
        let pb = create_year_progress_bar(years, self.config.show_progress);

        self.start(sink)?;
        while let Some(summary) = self.step(sink)? {
            pb.set_message(format!("{}", summary.year));
            pb.inc(1);
        }
        finish_progress_bar(&pb, Some("projection complete"));
        sink.finish(&self.summaries)?;

        info!(
            "Scenario '{}' finished in {:?}",
            self.config.scenario.name,
            start.elapsed()
        );

        let (snapshots, final_population) = self.store.into_parts();
        Ok(ProjectionResult {
            scenario: self.config.scenario.name,
            launch_year: self.launch_year,
            horizon_year: self.horizon_year,
            summaries: self.summaries,
            snapshots,
            final_population,
        })
    }
}
