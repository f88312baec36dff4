//! Births to women of reproductive age

use std::sync::Arc;

use crate::error::{ProjectionError, Result};
use crate::inputs::tables::{FertilityMultipliers, FertilityRates};
use crate::models::cohort::{AgeGroup, Category, Race, Sex};
use crate::models::table::CohortTable;

/// Share of births that are male
pub const MALE_BIRTH_FRACTION: f64 = 0.512_195_122;

/// Rates are expressed per this many women
pub const FERTILITY_RATE_BASE: f64 = 1_000.0;

/// `Births = Rate / 1000 x FemalePopulation`, split by a fixed sex ratio
#[derive(Debug, Clone, Copy)]
pub struct FertilityComponent<'a> {
    rates: &'a FertilityRates,
    multipliers: &'a FertilityMultipliers,
}

impl<'a> FertilityComponent<'a> {
    #[must_use]
    pub const fn new(rates: &'a FertilityRates, multipliers: &'a FertilityMultipliers) -> Self {
        Self { rates, multipliers }
    }

    /// Births in `year`, placed in the youngest age group
    pub fn births(&self, year: i32, population: &CohortTable) -> Result<CohortTable> {
        let space = population.space();
        let mut births = CohortTable::zeros(Arc::clone(space));

        for geo in 0..space.county_count() {
            for &race in Race::ALL {
                let mut total = 0.0;
                for age in AgeGroup::FERTILE {
                    let rate = self.rates.rate(geo, race, age).ok_or_else(|| {
                        ProjectionError::MissingRate {
                            table: FertilityRates::TABLE,
                            key: format!("({}, {age}, {race})", space.geoid(geo)),
                            year,
                        }
                    })?;
                    let multiplier = self.multipliers.get(age, year)?;
                    // Cohorts left below zero until end-of-year clipping bear no children
                    let women = population.get(geo, age, race, Sex::Female).max(0.0);
                    total += rate * multiplier / FERTILITY_RATE_BASE * women;
                }
                let (male, female) = split_births(total);
                births.set(geo, AgeGroup::YOUNGEST, race, Sex::Male, male);
                births.set(geo, AgeGroup::YOUNGEST, race, Sex::Female, female);
            }
        }
        Ok(births)
    }
}

/// Male and female births; female births take the remainder
#[must_use]
pub fn split_births(total: f64) -> (f64, f64) {
    let male = total * MALE_BIRTH_FRACTION;
    (male, total - male)
}
