//! External inputs of a projection run
//!
//! Raw rows are read from Parquet (`loader`), then densified over the cohort
//! space of the launch-year baseline into the lookup tables the components
//! read every year.

pub mod loader;
pub mod rows;
pub mod tables;

use std::sync::Arc;

use log::info;

use crate::config::ProjectionConfig;
use crate::error::{ProjectionError, Result};
use crate::models::coefficients::{CoefficientEntry, MigrationCoefficientSet};
use crate::models::cohort::{AgeGroup, GeoId, Race};
use crate::models::distance::{DistancePair, DistanceTable, PairAttributes};
use crate::models::space::CohortSpace;
use crate::models::table::CohortTable;
use crate::models::weights::AgeCorrelationWeights;

pub use loader::RawInputs;
pub use rows::{
    AgeWeightRow, BaselineRow, CoefficientRow, DistanceRow, FertilityMultiplierRow,
    FertilityRateRow, ImmigrationFractionRow, ImmigrationMultiplierRow, MigrationBaselineRow,
    MortalityMultiplierRow, MortalityRateRow,
};
pub use tables::{
    FertilityMultipliers, FertilityRates, ImmigrationFractions, ImmigrationMultipliers,
    MortalityMultipliers, MortalityRates,
};

use rows::parse_label;

/// Validated, dense inputs for one scenario
#[derive(Debug, Clone)]
pub struct ProjectionInputs {
    pub mortality_rates: MortalityRates,
    pub mortality_multipliers: MortalityMultipliers,
    pub fertility_rates: FertilityRates,
    pub fertility_multipliers: FertilityMultipliers,
    pub immigration_fractions: ImmigrationFractions,
    pub immigration_multipliers: ImmigrationMultipliers,
    pub age_weights: AgeCorrelationWeights,
    pub coefficients: Arc<MigrationCoefficientSet>,
    pub distances: Arc<DistanceTable>,
    /// Observed launch-year net migration, present when calibration is on
    pub migration_baseline: Option<CohortTable>,
}

impl ProjectionInputs {
    /// Densify raw rows over `space`
    ///
    /// The coefficient set must cover every (race, age group) of the
    /// configured model; a gap is reported here rather than mid-run.
    pub fn assemble(raw: &RawInputs, space: &Arc<CohortSpace>, config: &ProjectionConfig) -> Result<Self> {
        let coefficients = coefficient_set(&raw.coefficients, config.migration.significance_threshold)?;
        coefficients.ensure_complete(&config.scenario.model_name)?;

        let migration_baseline = if config.migration.calibrate {
            let rows = raw.migration_baseline.as_deref().ok_or_else(|| {
                ProjectionError::Config("calibration needs a migration baseline table".to_string())
            })?;
            Some(tables::migration_baseline(space, rows)?)
        } else {
            None
        };

        let inputs = Self {
            mortality_rates: MortalityRates::from_rows(space, &raw.mortality_rates)?,
            mortality_multipliers: tables::mortality_multipliers(&raw.mortality_multipliers)?,
            fertility_rates: FertilityRates::from_rows(space, &raw.fertility_rates)?,
            fertility_multipliers: tables::fertility_multipliers(&raw.fertility_multipliers)?,
            immigration_fractions: ImmigrationFractions::from_rows(space, &raw.immigration_fractions)?,
            immigration_multipliers: tables::immigration_multipliers(&raw.immigration_multipliers)?,
            age_weights: age_weights(&raw.age_weights)?,
            coefficients: Arc::new(coefficients),
            distances: Arc::new(distance_table(space, &raw.distances)?),
            migration_baseline,
        };

        info!(
            "Assembled inputs for {} counties ({} cohort cells)",
            space.county_count(),
            space.len()
        );
        Ok(inputs)
    }
}

/// Coefficient rows into the frozen coefficient set
pub fn coefficient_set(
    rows: &[CoefficientRow],
    significance_threshold: Option<f64>,
) -> Result<MigrationCoefficientSet> {
    const TABLE: &str = "migration coefficients";
    let entries = rows
        .iter()
        .map(|row| {
            Ok(CoefficientEntry {
                model: row.model.trim().to_string(),
                race: parse_label::<Race>(&row.race, TABLE)?,
                age_group: parse_label::<AgeGroup>(&row.age_group, TABLE)?,
                part: parse_label(&row.part, TABLE)?,
                term: parse_label(&row.term, TABLE)?,
                estimate: row.estimate,
                p_value: row.p_value,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    MigrationCoefficientSet::from_entries(entries, significance_threshold)
}

/// Age correlation rows into normalised weights
pub fn age_weights(rows: &[AgeWeightRow]) -> Result<AgeCorrelationWeights> {
    const TABLE: &str = "age weights";
    let triples = rows
        .iter()
        .map(|row| {
            Ok((
                parse_label::<AgeGroup>(&row.age_group, TABLE)?,
                parse_label::<AgeGroup>(&row.other_age_group, TABLE)?,
                row.rho,
            ))
        })
        .collect::<Result<Vec<_>>>()?;
    AgeCorrelationWeights::from_correlations(triples)
}

/// Distance rows into the dense pair table
pub fn distance_table(space: &CohortSpace, rows: &[DistanceRow]) -> Result<DistanceTable> {
    DistanceTable::from_pairs(
        space,
        rows.iter().map(|row| DistancePair {
            origin: GeoId::new(row.origin.trim()),
            destination: GeoId::new(row.destination.trim()),
            attributes: PairAttributes {
                distance: row.distance,
                same_labor_market: row.same_labor_market,
                urban_destination: row.urban_destination,
            },
        }),
    )
}
