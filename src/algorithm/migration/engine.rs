//! Gravity-model migration engine
//!
//! Each (race, age group) slice is an independent regression over every
//! ordered county pair. Races fan out over the rayon pool and origins are
//! folded in parallel inside a slice; the per-thread inflow vectors are
//! reduced before the slice is written into the year's tables.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use rayon::prelude::*;

use crate::algorithm::migration::calibration::MigrationCalibrator;
use crate::algorithm::migration::regression;
use crate::algorithm::migration::spatial::{SpatialField, SpatialVariableCalculator};
use crate::config::MigrationConfig;
use crate::error::{ProjectionError, Result};
use crate::models::coefficients::MigrationCoefficientSet;
use crate::models::cohort::{AgeGroup, Category, GeoId, Race, Sex};
use crate::models::distance::DistanceTable;
use crate::models::table::CohortTable;
use crate::models::weights::AgeCorrelationWeights;

/// Predicted migrants between two counties for one (age group, race)
#[derive(Debug, Clone, PartialEq)]
pub struct GrossFlow {
    pub origin: GeoId,
    pub destination: GeoId,
    pub age_group: AgeGroup,
    pub race: Race,
    pub flow: f64,
}

/// Domestic migration of one simulated year
#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    /// Inflow minus outflow, calibrated when a baseline is configured
    pub net: CohortTable,
    /// Gross inflow per cohort
    pub inmigration: CohortTable,
    /// Gross outflow per cohort
    pub outmigration: CohortTable,
}

impl MigrationOutcome {
    /// Total migrants moving between counties
    #[must_use]
    pub fn gross_total(&self) -> f64 {
        self.outmigration.total()
    }
}

/// Sex-split gross flows of one slice, indexed `[sex][county]`
#[derive(Debug, Clone)]
struct SliceFlows {
    age: AgeGroup,
    inflow: [Vec<f64>; Sex::COUNT],
    outflow: [Vec<f64>; Sex::COUNT],
}

impl SliceFlows {
    fn zeros(age: AgeGroup, counties: usize) -> Self {
        Self {
            age,
            inflow: [vec![0.0; counties], vec![0.0; counties]],
            outflow: [vec![0.0; counties], vec![0.0; counties]],
        }
    }

    fn merge(mut self, other: Self) -> Self {
        for sex in 0..Sex::COUNT {
            for (a, b) in self.inflow[sex].iter_mut().zip(&other.inflow[sex]) {
                *a += b;
            }
            for (a, b) in self.outflow[sex].iter_mut().zip(&other.outflow[sex]) {
                *a += b;
            }
        }
        self
    }
}

/// Population of one (county, age group, race) cell with negative sexes read
/// as zero
///
/// Under end-of-year clipping a cohort may sit below zero between stages.
fn present(population: &CohortTable, geo: usize, age: AgeGroup, race: Race) -> (f64, f64) {
    (
        population.get(geo, age, race, Sex::Male).max(0.0),
        population.get(geo, age, race, Sex::Female).max(0.0),
    )
}

/// Share of males in an origin cohort; an empty cohort splits evenly
fn male_share(population: &CohortTable, geo: usize, age: AgeGroup, race: Race) -> f64 {
    let (male, female) = present(population, geo, age, race);
    let total = male + female;
    if total > 0.0 { male / total } else { 0.5 }
}

fn present_total(population: &CohortTable, geo: usize, age: AgeGroup, race: Race) -> f64 {
    let (male, female) = present(population, geo, age, race);
    male + female
}

/// Interregional migration estimator
#[derive(Debug, Clone)]
pub struct MigrationEngine {
    model_name: String,
    coefficients: Arc<MigrationCoefficientSet>,
    weights: AgeCorrelationWeights,
    calculator: SpatialVariableCalculator,
    parallel_races: bool,
    calibrator: Option<MigrationCalibrator>,
}

impl MigrationEngine {
    /// Create an engine for one coefficient model
    ///
    /// # Arguments
    /// * `model_name` - Model key in the coefficient set
    /// * `coefficients` - Frozen coefficient set
    /// * `weights` - Age-correlation weights for destination population
    /// * `distances` - Pair distances and classifications
    /// * `config` - Migration switches
    #[must_use]
    pub fn new(
        model_name: impl Into<String>,
        coefficients: Arc<MigrationCoefficientSet>,
        weights: AgeCorrelationWeights,
        distances: Arc<DistanceTable>,
        config: &MigrationConfig,
    ) -> Self {
        let start = Instant::now();
        let calculator = SpatialVariableCalculator::new(distances, config.intervening_opportunities);
        debug!(
            "Sorted distance orderings for {} counties in {:?}",
            calculator.county_count(),
            start.elapsed()
        );
        Self {
            model_name: model_name.into(),
            coefficients,
            weights,
            calculator,
            parallel_races: config.parallel_races,
            calibrator: None,
        }
    }

    /// Calibrate net migration against observed launch-year values
    #[must_use]
    pub fn with_calibration(mut self, observed: CohortTable) -> Self {
        self.calibrator = Some(MigrationCalibrator::new(observed));
        self
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    #[must_use]
    pub fn calculator(&self) -> &SpatialVariableCalculator {
        &self.calculator
    }

    fn check_space(&self, population: &CohortTable) -> Result<()> {
        let counties = population.space().county_count();
        if counties != self.calculator.county_count() {
            return Err(ProjectionError::InvalidInput(format!(
                "population has {counties} counties, distance table has {}",
                self.calculator.county_count()
            )));
        }
        Ok(())
    }

    /// Spatial variables of one slice
    ///
    /// Cells below zero contribute nothing to `Pi` or `Pj`.
    pub fn slice_field(&self, population: &CohortTable, race: Race, age: AgeGroup) -> Result<SpatialField> {
        let n = population.space().county_count();
        let pi = (0..n).map(|i| present_total(population, i, age, race)).collect();
        let pj = (0..n)
            .map(|j| self.weights.combine(age, |band| present_total(population, j, band, race)))
            .collect();
        self.calculator.field(pi, pj)
    }

    fn slice_flows(&self, population: &CohortTable, race: Race, age: AgeGroup) -> Result<SliceFlows> {
        let space = population.space();
        let n = space.county_count();
        let coefficients = self.coefficients.get(&self.model_name, race, age)?;
        let field = self.slice_field(population, race, age)?;
        let empty = move || SliceFlows::zeros(age, n);

        (0..n)
            .into_par_iter()
            .filter(|&origin| field.pi[origin] > 0.0)
            .try_fold(empty, |mut acc, origin| {
                let share = male_share(population, origin, age, race);
                let mut total = 0.0;
                self.calculator.for_each_pair(&field, origin, |pair| {
                    let flow = regression::predict(&coefficients, &pair, space)?.flow;
                    acc.inflow[Sex::Male.index()][pair.destination] += flow * share;
                    acc.inflow[Sex::Female.index()][pair.destination] += flow * (1.0 - share);
                    total += flow;
                    Ok(())
                })?;
                acc.outflow[Sex::Male.index()][origin] += total * share;
                acc.outflow[Sex::Female.index()][origin] += total * (1.0 - share);
                Ok(acc)
            })
            .try_reduce(empty, |a, b| Ok(a.merge(b)))
    }

    fn race_flows(&self, population: &CohortTable, race: Race) -> Result<Vec<SliceFlows>> {
        AgeGroup::ALL
            .iter()
            .map(|&age| self.slice_flows(population, race, age))
            .collect()
    }

    /// Project one year of domestic migration from the current population
    pub fn project(&mut self, year: i32, population: &CohortTable) -> Result<MigrationOutcome> {
        self.check_space(population)?;
        let start = Instant::now();

        let per_race: Vec<Vec<SliceFlows>> = if self.parallel_races {
            Race::ALL
                .par_iter()
                .map(|&race| self.race_flows(population, race))
                .collect::<Result<_>>()
        } else {
            Race::ALL
                .iter()
                .map(|&race| self.race_flows(population, race))
                .collect::<Result<_>>()
        }
        .map_err(|e| e.in_year(year))?;

        let space = Arc::clone(population.space());
        let mut inmigration = CohortTable::zeros(Arc::clone(&space));
        let mut outmigration = CohortTable::zeros(Arc::clone(&space));
        for (&race, slices) in Race::ALL.iter().zip(&per_race) {
            for slice in slices {
                for geo in 0..space.county_count() {
                    for &sex in Sex::ALL {
                        inmigration.set(geo, slice.age, race, sex, slice.inflow[sex.index()][geo]);
                        outmigration.set(geo, slice.age, race, sex, slice.outflow[sex.index()][geo]);
                    }
                }
            }
        }

        let mut net = inmigration.difference(&outmigration)?;
        if let Some(calibrator) = self.calibrator.as_mut() {
            net = calibrator.calibrate(year, &net)?;
        }

        info!(
            "[{year}] Migration: {:.0} gross migrants, net {:.1} in {:?}",
            outmigration.total(),
            net.total(),
            start.elapsed()
        );

        Ok(MigrationOutcome {
            net,
            inmigration,
            outmigration,
        })
    }

    /// Every pair flow of one slice
    pub fn gross_flows(&self, population: &CohortTable, race: Race, age: AgeGroup) -> Result<Vec<GrossFlow>> {
        self.check_space(population)?;
        let space = population.space();
        let coefficients = self.coefficients.get(&self.model_name, race, age)?;
        let field = self.slice_field(population, race, age)?;

        let mut flows = Vec::new();
        for origin in 0..space.county_count() {
            if field.pi[origin] <= 0.0 {
                continue;
            }
            self.calculator.for_each_pair(&field, origin, |pair| {
                flows.push(GrossFlow {
                    origin: space.geoid(pair.origin).clone(),
                    destination: space.geoid(pair.destination).clone(),
                    age_group: age,
                    race,
                    flow: regression::predict(&coefficients, &pair, space)?.flow,
                });
                Ok(())
            })?;
        }
        Ok(flows)
    }
}
