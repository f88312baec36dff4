//! Deaths by cohort

use std::sync::Arc;

use crate::error::{ProjectionError, Result};
use crate::inputs::tables::{MortalityMultipliers, MortalityRates};
use crate::models::table::CohortTable;

/// Rates are expressed per this many persons
pub const MORTALITY_RATE_BASE: f64 = 100_000.0;

/// `Deaths = Population x Rate x Multiplier / 100000`
#[derive(Debug, Clone, Copy)]
pub struct MortalityComponent<'a> {
    rates: &'a MortalityRates,
    multipliers: &'a MortalityMultipliers,
}

impl<'a> MortalityComponent<'a> {
    #[must_use]
    pub const fn new(rates: &'a MortalityRates, multipliers: &'a MortalityMultipliers) -> Self {
        Self { rates, multipliers }
    }

    /// Deaths in `year` for every cohort of `population`
    ///
    /// A cohort without a rate, or an (age group, sex) without a multiplier
    /// for the year, halts the run.
    pub fn deaths(&self, year: i32, population: &CohortTable) -> Result<CohortTable> {
        let space = population.space();
        let mut deaths = CohortTable::zeros(Arc::clone(space));
        for (idx, (&pop, out)) in population
            .values()
            .iter()
            .zip(deaths.values_mut())
            .enumerate()
        {
            let rate = self.rates.rate(idx).ok_or_else(|| ProjectionError::MissingRate {
                table: MortalityRates::TABLE,
                key: space.key_at(idx).to_string(),
                year,
            })?;
            let (_, age, _, sex) = space.decompose(idx);
            let multiplier = self.multipliers.get((age, sex), year)?;
            *out = pop * rate * multiplier / MORTALITY_RATE_BASE;
        }
        Ok(deaths)
    }
}
