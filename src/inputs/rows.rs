//! Row layouts of the external input tables
//!
//! Each struct mirrors the columns of one Parquet file and is read with
//! `serde_arrow`. Category columns are text labels and are validated when
//! the tables are assembled.

use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, Result};
use crate::models::cohort::{AgeGroup, Category, CohortKey, GeoId, Race, Sex};

/// Launch-year (or later) county population by cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineRow {
    pub geoid: String,
    pub year: i32,
    pub age_group: String,
    pub race: String,
    pub sex: String,
    pub population: f64,
}

/// Deaths per 100,000 by cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MortalityRateRow {
    pub geoid: String,
    pub age_group: String,
    pub race: String,
    pub sex: String,
    pub rate_per_100k: f64,
}

/// Births per 1,000 women by county, race and age group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilityRateRow {
    pub geoid: String,
    pub race: String,
    pub age_group: String,
    pub rate_per_1000: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MortalityMultiplierRow {
    pub age_group: String,
    pub sex: String,
    pub year: i32,
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilityMultiplierRow {
    pub age_group: String,
    pub year: i32,
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImmigrationMultiplierRow {
    pub year: i32,
    pub multiplier: f64,
}

/// Share of national net immigration allocated to one cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImmigrationFractionRow {
    pub year: i32,
    pub geoid: String,
    pub race: String,
    pub age_group: String,
    pub sex: String,
    pub fraction: f64,
}

/// Correlation between migration of two age bands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeWeightRow {
    pub age_group: String,
    pub other_age_group: String,
    pub rho: f64,
}

/// One estimate of the two-part migration regression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientRow {
    pub model: String,
    pub race: String,
    pub age_group: String,
    pub part: String,
    pub term: String,
    pub estimate: f64,
    pub p_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceRow {
    pub origin: String,
    pub destination: String,
    pub distance: f64,
    pub same_labor_market: bool,
    pub urban_destination: bool,
}

/// Observed net migration in the launch year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationBaselineRow {
    pub geoid: String,
    pub age_group: String,
    pub race: String,
    pub sex: String,
    pub net_migration: f64,
}

/// Parse a category label, naming the table on failure
pub fn parse_label<C: Category>(label: &str, table: &str) -> Result<C> {
    C::from_label(label).ok_or_else(|| {
        ProjectionError::InvalidInput(format!("{table}: unknown {} label '{label}'", C::NAME))
    })
}

/// Parse the four key columns shared by cohort-keyed tables
pub fn parse_cohort_key(
    geoid: &str,
    age_group: &str,
    race: &str,
    sex: &str,
    table: &str,
) -> Result<CohortKey> {
    Ok(CohortKey {
        geoid: GeoId::new(geoid.trim()),
        age_group: parse_label::<AgeGroup>(age_group, table)?,
        race: parse_label::<Race>(race, table)?,
        sex: parse_label::<Sex>(sex, table)?,
    })
}

/// Reject negative or non-finite values
pub fn ensure_non_negative(value: f64, column: &str, table: &str) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ProjectionError::InvalidInput(format!(
            "{table}: {column} must be a non-negative number, got {value}"
        )))
    }
}
