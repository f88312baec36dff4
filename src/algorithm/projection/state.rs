//! Current cohort population and its yearly time series

use std::sync::Arc;

use log::{info, warn};

use crate::config::ClippingPolicy;
use crate::error::{ProjectionError, Result};
use crate::inputs::rows::{BaselineRow, ensure_non_negative, parse_cohort_key};
use crate::models::cohort::GeoId;
use crate::models::space::CohortSpace;
use crate::models::table::{ClipReport, CohortTable, DeltaOp};

/// Population of every cohort at the end of one year
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionSnapshot {
    pub year: i32,
    pub population: CohortTable,
}

/// Result of applying one component's delta
#[derive(Debug, Clone)]
pub struct AppliedDelta {
    /// The change that actually reached the population, in the sign
    /// convention of the operation (deaths are positive under `Subtract`)
    pub applied: CohortTable,
    /// Cells clipped back to zero by this stage
    pub clipped: ClipReport,
}

/// Combine a delta with a population table and clip the result at zero
///
/// Returns the clipped table together with the clip report. The key set is
/// preserved because both tables share one cohort space.
pub fn apply_delta(
    table: &CohortTable,
    delta: &CohortTable,
    op: DeltaOp,
) -> Result<(CohortTable, ClipReport)> {
    let mut result = table.combine(delta, op)?;
    let report = result.clip_negative();
    Ok((result, report))
}

fn warn_negative(year: i32, stage: &str, report: &ClipReport) {
    if !report.is_empty() {
        warn!(
            "[{year}] {stage}: clipped {} negative cells ({:.3} persons) to zero",
            report.cells, report.mass
        );
    }
}

/// Owner of the current population
#[derive(Debug, Clone)]
pub struct CohortStateStore {
    current: CohortTable,
    clipping: ClippingPolicy,
    retain_snapshots: bool,
    series: Vec<ProjectionSnapshot>,
}

impl CohortStateStore {
    /// Build the launch-year table from baseline rows
    ///
    /// The county set is taken from the launch-year rows; every county must
    /// then carry the full (age group, race, sex) cross.
    pub fn load(rows: &[BaselineRow], launch_year: i32, clipping: ClippingPolicy) -> Result<Self> {
        const TABLE: &str = "baseline population";
        let launch_rows: Vec<&BaselineRow> = rows.iter().filter(|r| r.year == launch_year).collect();
        if launch_rows.is_empty() {
            return Err(ProjectionError::MissingBaseline {
                year: launch_year,
                key: "any cohort".to_string(),
            });
        }

        let space = Arc::new(CohortSpace::new(
            launch_rows.iter().map(|r| GeoId::new(r.geoid.trim())),
        )?);
        let mut table = CohortTable::zeros(Arc::clone(&space));
        let mut seen = vec![false; space.len()];

        for row in launch_rows {
            let key = parse_cohort_key(&row.geoid, &row.age_group, &row.race, &row.sex, TABLE)?;
            let population = ensure_non_negative(row.population, "population", TABLE)?;
            let Some(idx) = space.index_of(&key) else {
                continue;
            };
            if std::mem::replace(&mut seen[idx], true) {
                return Err(ProjectionError::InvalidInput(format!(
                    "{TABLE}: duplicate row for {key} in {launch_year}"
                )));
            }
            table.values_mut()[idx] = population;
        }

        if let Some(missing) = seen.iter().position(|present| !present) {
            return Err(ProjectionError::MissingBaseline {
                year: launch_year,
                key: space.key_at(missing).to_string(),
            });
        }

        info!(
            "Loaded launch-year {launch_year} baseline: {} counties, population {:.0}",
            space.county_count(),
            table.total()
        );
        Ok(Self::from_table(table, clipping))
    }

    /// Wrap an existing population table
    #[must_use]
    pub fn from_table(table: CohortTable, clipping: ClippingPolicy) -> Self {
        Self {
            current: table,
            clipping,
            retain_snapshots: true,
            series: Vec::new(),
        }
    }

    /// Keep only the latest snapshot instead of the whole series
    #[must_use]
    pub const fn with_retained_snapshots(mut self, retain: bool) -> Self {
        self.retain_snapshots = retain;
        self
    }

    #[must_use]
    pub fn current(&self) -> &CohortTable {
        &self.current
    }

    #[must_use]
    pub fn space(&self) -> &Arc<CohortSpace> {
        self.current.space()
    }

    #[must_use]
    pub const fn clipping(&self) -> ClippingPolicy {
        self.clipping
    }

    /// Apply a component delta to the current population
    ///
    /// Under `PerStage` clipping the result is clipped immediately and the
    /// returned delta is the post-clip change. Under `EndOfYear` negative
    /// cells are left until `finish_year`.
    pub fn apply_delta(
        &mut self,
        delta: &CohortTable,
        op: DeltaOp,
        year: i32,
        stage: &str,
    ) -> Result<AppliedDelta> {
        match self.clipping {
            ClippingPolicy::PerStage => {
                let (next, clipped) = apply_delta(&self.current, delta, op)?;
                warn_negative(year, stage, &clipped);
                let applied = match op {
                    DeltaOp::Add => next.difference(&self.current)?,
                    DeltaOp::Subtract => self.current.difference(&next)?,
                };
                self.current = next;
                Ok(AppliedDelta { applied, clipped })
            }
            ClippingPolicy::EndOfYear => {
                self.current = self.current.combine(delta, op)?;
                Ok(AppliedDelta {
                    applied: delta.clone(),
                    clipped: ClipReport::default(),
                })
            }
        }
    }

    /// Close a simulated year, clipping any remaining negative cells
    pub fn finish_year(&mut self, year: i32) -> ClipReport {
        let report = self.current.clip_negative();
        warn_negative(year, "end of year", &report);
        report
    }

    /// Append the current population to the series
    pub fn snapshot(&mut self, year: i32) -> &ProjectionSnapshot {
        if !self.retain_snapshots {
            self.series.clear();
        }
        self.series.push(ProjectionSnapshot {
            year,
            population: self.current.clone(),
        });
        &self.series[self.series.len() - 1]
    }

    #[must_use]
    pub fn series(&self) -> &[ProjectionSnapshot] {
        &self.series
    }

    /// Consume the store, returning the series and the final population
    #[must_use]
    pub fn into_parts(self) -> (Vec<ProjectionSnapshot>, CohortTable) {
        (self.series, self.current)
    }
}
