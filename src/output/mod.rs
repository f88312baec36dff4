//! Persisted projection results
//!
//! The driver hands every simulated year's component tables to a
//! `ProjectionSink`. `MemorySink` keeps them in memory; `ParquetSink`
//! writes them to disk in the configured layout.

pub mod manifest;
pub mod parquet;

use std::sync::Arc;

use cohort_macros::Category;

use crate::algorithm::projection::YearSummary;
use crate::error::Result;
use crate::models::space::CohortSpace;
use crate::models::table::CohortTable;

pub use manifest::RunManifest;
pub use parquet::{OutputRow, ParquetSink};

/// Demographic component tables written per year
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Category)]
#[category(name = "output component")]
pub enum OutputComponent {
    #[category(label = "population")]
    Population,
    #[category(label = "deaths")]
    Deaths,
    #[category(label = "births")]
    Births,
    #[category(label = "net_migration")]
    NetMigration,
    #[category(label = "net_immigration")]
    NetImmigration,
    #[category(label = "inmigration")]
    Inmigration,
    #[category(label = "outmigration")]
    Outmigration,
}

/// Identity of a run, passed to sinks before the first year
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub scenario: String,
    pub model_name: String,
    pub launch_year: i32,
    pub horizon_year: i32,
    pub space: Arc<CohortSpace>,
}

/// Component tables of one simulated year
#[derive(Debug, Clone)]
pub struct YearTables {
    pub year: i32,
    pub tables: Vec<(OutputComponent, CohortTable)>,
}

impl YearTables {
    #[must_use]
    pub const fn new(year: i32) -> Self {
        Self {
            year,
            tables: Vec::new(),
        }
    }

    pub fn push(&mut self, component: OutputComponent, table: CohortTable) {
        self.tables.push((component, table));
    }

    #[must_use]
    pub fn get(&self, component: OutputComponent) -> Option<&CohortTable> {
        self.tables
            .iter()
            .find(|(c, _)| *c == component)
            .map(|(_, table)| table)
    }
}

/// Receiver of projection output
pub trait ProjectionSink: Send {
    /// Called once before the launch-year tables
    fn begin(&mut self, _run: &RunInfo) -> Result<()> {
        Ok(())
    }

    /// Called once per year, launch year first
    fn record(&mut self, tables: &YearTables) -> Result<()>;

    /// Called after the horizon year
    fn finish(&mut self, _summaries: &[YearSummary]) -> Result<()> {
        Ok(())
    }
}

/// Keeps every recorded year in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub run: Option<RunInfo>,
    pub years: Vec<YearTables>,
    pub finished: bool,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables of one year
    #[must_use]
    pub fn year(&self, year: i32) -> Option<&YearTables> {
        self.years.iter().find(|y| y.year == year)
    }

    /// Time series of one component's total
    #[must_use]
    pub fn totals(&self, component: OutputComponent) -> Vec<(i32, f64)> {
        self.years
            .iter()
            .filter_map(|y| y.get(component).map(|t| (y.year, t.total())))
            .collect()
    }
}

impl ProjectionSink for MemorySink {
    fn begin(&mut self, run: &RunInfo) -> Result<()> {
        self.run = Some(run.clone());
        self.years.clear();
        self.finished = false;
        Ok(())
    }

    fn record(&mut self, tables: &YearTables) -> Result<()> {
        self.years.push(tables.clone());
        Ok(())
    }

    fn finish(&mut self, _summaries: &[YearSummary]) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
