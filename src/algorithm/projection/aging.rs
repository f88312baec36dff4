//! Advancement of cohorts along the age axis

use std::sync::Arc;

use crate::models::cohort::{AgeGroup, Category, Race, Sex};
use crate::models::table::CohortTable;

/// Share of a five-year band that moves up in one simulated year
pub const AGING_SHARE: f64 = 0.2;

/// Shifts a fifth of each band into the next one; `85+` keeps its members
#[derive(Debug, Clone, Copy, Default)]
pub struct AgingStep;

impl AgingStep {
    /// Transfers between bands as a delta table (sums to zero)
    #[must_use]
    pub fn delta(&self, population: &CohortTable) -> CohortTable {
        let space = population.space();
        let mut delta = CohortTable::zeros(Arc::clone(space));
        for geo in 0..space.county_count() {
            for &race in Race::ALL {
                for &sex in Sex::ALL {
                    for &age in AgeGroup::ALL {
                        let Some(next) = age.next() else {
                            continue;
                        };
                        let moving = population.get(geo, age, race, sex) * AGING_SHARE;
                        delta.add(geo, age, race, sex, -moving);
                        delta.add(geo, next, race, sex, moving);
                    }
                }
            }
        }
        delta
    }

    /// Aged copy of `population`
    #[must_use]
    pub fn apply(&self, population: &CohortTable) -> CohortTable {
        let delta = self.delta(population);
        let mut aged = population.clone();
        for (value, change) in aged.values_mut().iter_mut().zip(delta.values()) {
            *value += change;
        }
        aged
    }
}
