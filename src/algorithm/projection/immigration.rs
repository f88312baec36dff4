//! International net immigration

use std::sync::Arc;

use log::debug;

use crate::error::{ProjectionError, Result};
use crate::inputs::tables::{ImmigrationFractions, ImmigrationMultipliers};
use crate::models::space::CohortSpace;
use crate::models::table::CohortTable;

/// Distributes national net immigration over the cohort space
#[derive(Debug, Clone, Copy)]
pub struct ImmigrationComponent<'a> {
    national_net_immigration: f64,
    fractions: &'a ImmigrationFractions,
    multipliers: &'a ImmigrationMultipliers,
    tolerance: f64,
}

impl<'a> ImmigrationComponent<'a> {
    /// # Arguments
    /// * `national_net_immigration` - Scenario-level national total
    /// * `fractions` - Allocation fractions by table year
    /// * `multipliers` - Yearly adjustment of the national total
    /// * `tolerance` - Allowed deviation of the fraction sum from 1
    #[must_use]
    pub const fn new(
        national_net_immigration: f64,
        fractions: &'a ImmigrationFractions,
        multipliers: &'a ImmigrationMultipliers,
        tolerance: f64,
    ) -> Self {
        Self {
            national_net_immigration,
            fractions,
            multipliers,
            tolerance,
        }
    }

    /// National net immigration after the yearly multiplier
    pub fn national_total(&self, year: i32) -> Result<f64> {
        Ok(self.national_net_immigration * self.multipliers.get((), year)?)
    }

    /// Net immigrants per cohort in `year`
    ///
    /// The result may be negative where national net immigration is; the
    /// state store clips the population afterwards.
    pub fn immigrants(&self, year: i32, space: &Arc<CohortSpace>) -> Result<CohortTable> {
        let (table_year, fractions) = self.fractions.for_year(year)?;
        let sum: f64 = fractions.iter().sum();
        let deviation = (sum - 1.0).abs();
        if deviation.is_nan() || deviation > self.tolerance {
            return Err(ProjectionError::FractionIntegrity {
                year,
                sum,
                tolerance: self.tolerance,
            });
        }

        let total = self.national_total(year)?;
        debug!("[{year}] Allocating {total:.1} net immigrants with {table_year} fractions");
        CohortTable::from_values(
            Arc::clone(space),
            fractions.iter().map(|f| f * total).collect(),
        )
    }
}
