//! Cohort tables
//!
//! A `CohortTable` maps every cohort key of a `CohortSpace` to a number. The
//! same type holds populations (non-negative after each stage) and signed
//! component deltas.

use std::sync::Arc;

use crate::error::{ProjectionError, Result};
use crate::models::cohort::{AgeGroup, Category, Race, Sex};
use crate::models::space::CohortSpace;

/// How a delta table is combined with a population table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOp {
    Add,
    Subtract,
}

/// Cells pushed below zero and clipped back
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClipReport {
    /// Number of clipped cells
    pub cells: usize,
    /// Total negative mass removed by clipping (positive number)
    pub mass: f64,
}

impl ClipReport {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cells == 0
    }

    pub fn merge(&mut self, other: Self) {
        self.cells += other.cells;
        self.mass += other.mass;
    }
}

/// Dense table over the full cohort cross
#[derive(Debug, Clone, PartialEq)]
pub struct CohortTable {
    space: Arc<CohortSpace>,
    values: Vec<f64>,
}

impl CohortTable {
    /// A table of zeros
    #[must_use]
    pub fn zeros(space: Arc<CohortSpace>) -> Self {
        let len = space.len();
        Self {
            space,
            values: vec![0.0; len],
        }
    }

    /// Wrap existing values; the length must match the space
    pub fn from_values(space: Arc<CohortSpace>, values: Vec<f64>) -> Result<Self> {
        if values.len() != space.len() {
            return Err(ProjectionError::InvalidInput(format!(
                "table has {} cells, cohort space has {}",
                values.len(),
                space.len()
            )));
        }
        Ok(Self { space, values })
    }

    #[must_use]
    pub fn space(&self) -> &Arc<CohortSpace> {
        &self.space
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    #[must_use]
    pub fn get(&self, geo: usize, age: AgeGroup, race: Race, sex: Sex) -> f64 {
        self.values[self.space.index(geo, age, race, sex)]
    }

    pub fn set(&mut self, geo: usize, age: AgeGroup, race: Race, sex: Sex, value: f64) {
        let idx = self.space.index(geo, age, race, sex);
        self.values[idx] = value;
    }

    pub fn add(&mut self, geo: usize, age: AgeGroup, race: Race, sex: Sex, value: f64) {
        let idx = self.space.index(geo, age, race, sex);
        self.values[idx] += value;
    }

    /// Both sexes of one (county, age group, race) cell
    #[must_use]
    pub fn both_sexes(&self, geo: usize, age: AgeGroup, race: Race) -> f64 {
        self.get(geo, age, race, Sex::Male) + self.get(geo, age, race, Sex::Female)
    }

    /// Sum over every cell
    #[must_use]
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Sum over the cells of one race
    #[must_use]
    pub fn race_total(&self, race: Race) -> f64 {
        (0..self.space.county_count())
            .flat_map(|geo| {
                AgeGroup::ALL
                    .iter()
                    .map(move |&age| self.both_sexes(geo, age, race))
            })
            .sum()
    }

    /// Number of cells below zero
    #[must_use]
    pub fn negative_cells(&self) -> usize {
        self.values.iter().filter(|v| **v < 0.0).count()
    }

    /// Clip negative cells to zero in place
    pub fn clip_negative(&mut self) -> ClipReport {
        let mut report = ClipReport::default();
        for value in &mut self.values {
            if *value < 0.0 {
                report.cells += 1;
                report.mass -= *value;
                *value = 0.0;
            }
        }
        report
    }

    /// Whether two tables share the same cohort space
    #[must_use]
    pub fn same_space(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.space, &other.space) || self.space == other.space
    }

    /// Element-wise combination with a delta table, without clipping
    pub fn combine(&self, delta: &Self, op: DeltaOp) -> Result<Self> {
        if !self.same_space(delta) {
            return Err(ProjectionError::InvalidInput(
                "delta table is over a different cohort space".to_string(),
            ));
        }
        let values = self
            .values
            .iter()
            .zip(&delta.values)
            .map(|(v, d)| match op {
                DeltaOp::Add => v + d,
                DeltaOp::Subtract => v - d,
            })
            .collect();
        Ok(Self {
            space: Arc::clone(&self.space),
            values,
        })
    }

    /// Cell-wise difference `self - other`
    pub fn difference(&self, other: &Self) -> Result<Self> {
        self.combine(other, DeltaOp::Subtract)
    }
}
