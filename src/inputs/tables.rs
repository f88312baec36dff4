//! Dense lookup tables built from the external rate and allocation inputs

use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use log::warn;
use rustc_hash::FxHashMap;

use crate::error::{ProjectionError, Result};
use crate::inputs::rows::{
    FertilityMultiplierRow, FertilityRateRow, ImmigrationFractionRow, ImmigrationMultiplierRow,
    MigrationBaselineRow, MortalityMultiplierRow, MortalityRateRow, ensure_non_negative,
    parse_cohort_key, parse_label,
};
use crate::models::cohort::{AgeGroup, Category, GeoId, Race, Sex};
use crate::models::space::CohortSpace;
use crate::models::table::CohortTable;

fn warn_skipped(skipped: usize, table: &str) {
    if skipped > 0 {
        warn!("{table}: skipped {skipped} rows for counties outside the baseline");
    }
}

/// Deaths per 100,000 for every cohort, `None` where the provider gave no rate
#[derive(Debug, Clone)]
pub struct MortalityRates {
    rates: Vec<Option<f64>>,
}

impl MortalityRates {
    pub const TABLE: &'static str = "mortality rates";

    pub fn from_rows(space: &CohortSpace, rows: &[MortalityRateRow]) -> Result<Self> {
        let mut rates = vec![None; space.len()];
        let mut skipped = 0usize;
        for row in rows {
            let key = parse_cohort_key(&row.geoid, &row.age_group, &row.race, &row.sex, Self::TABLE)?;
            let Some(idx) = space.index_of(&key) else {
                skipped += 1;
                continue;
            };
            rates[idx] = Some(ensure_non_negative(row.rate_per_100k, "rate_per_100k", Self::TABLE)?);
        }
        warn_skipped(skipped, Self::TABLE);
        Ok(Self { rates })
    }

    /// Rate for the cell at a flat index
    #[must_use]
    pub fn rate(&self, idx: usize) -> Option<f64> {
        self.rates[idx]
    }
}

/// Births per 1,000 women by county, race and fertile age group
#[derive(Debug, Clone)]
pub struct FertilityRates {
    counties: usize,
    rates: Vec<Option<f64>>,
}

impl FertilityRates {
    pub const TABLE: &'static str = "fertility rates";

    fn slot(geo: usize, race: Race, age: AgeGroup) -> usize {
        (geo * Race::COUNT + race.index()) * AgeGroup::COUNT + age.index()
    }

    pub fn from_rows(space: &CohortSpace, rows: &[FertilityRateRow]) -> Result<Self> {
        let counties = space.county_count();
        let mut rates = vec![None; counties * Race::COUNT * AgeGroup::COUNT];
        let mut skipped = 0usize;
        for row in rows {
            let age: AgeGroup = parse_label(&row.age_group, Self::TABLE)?;
            let race: Race = parse_label(&row.race, Self::TABLE)?;
            if !age.is_fertile() {
                return Err(ProjectionError::InvalidInput(format!(
                    "{}: age group {age} is outside the reproductive ages",
                    Self::TABLE
                )));
            }
            let Some(geo) = space.geo_index(&GeoId::new(row.geoid.trim())) else {
                skipped += 1;
                continue;
            };
            rates[Self::slot(geo, race, age)] =
                Some(ensure_non_negative(row.rate_per_1000, "rate_per_1000", Self::TABLE)?);
        }
        warn_skipped(skipped, Self::TABLE);
        Ok(Self { counties, rates })
    }

    #[must_use]
    pub fn rate(&self, geo: usize, race: Race, age: AgeGroup) -> Option<f64> {
        debug_assert!(geo < self.counties);
        self.rates[Self::slot(geo, race, age)]
    }
}

/// Year-keyed adjustment multipliers
///
/// Lookups of an absent (key, year) are fatal: the provider is expected to
/// cover every simulated year.
#[derive(Debug, Clone)]
pub struct YearlyMultipliers<K> {
    table: &'static str,
    values: FxHashMap<(K, i32), f64>,
}

impl<K: Copy + Eq + Hash + fmt::Debug> YearlyMultipliers<K> {
    pub fn new(table: &'static str, entries: impl IntoIterator<Item = ((K, i32), f64)>) -> Result<Self> {
        let mut values = FxHashMap::default();
        for ((key, year), multiplier) in entries {
            let multiplier = ensure_non_negative(multiplier, "multiplier", table)?;
            if values.insert((key, year), multiplier).is_some() {
                return Err(ProjectionError::InvalidInput(format!(
                    "{table}: duplicate multiplier for {key:?} in {year}"
                )));
            }
        }
        Ok(Self { table, values })
    }

    pub fn get(&self, key: K, year: i32) -> Result<f64> {
        self.values
            .get(&(key, year))
            .copied()
            .ok_or_else(|| ProjectionError::MissingRate {
                table: self.table,
                key: format!("{key:?}"),
                year,
            })
    }
}

/// Mortality adjustment by (age group, sex, year)
pub type MortalityMultipliers = YearlyMultipliers<(AgeGroup, Sex)>;
/// Fertility adjustment by (age group, year)
pub type FertilityMultipliers = YearlyMultipliers<AgeGroup>;
/// Immigration adjustment by year
pub type ImmigrationMultipliers = YearlyMultipliers<()>;

pub fn mortality_multipliers(rows: &[MortalityMultiplierRow]) -> Result<MortalityMultipliers> {
    const TABLE: &str = "mortality multipliers";
    let entries = rows
        .iter()
        .map(|row| {
            let age = parse_label::<AgeGroup>(&row.age_group, TABLE)?;
            let sex = parse_label::<Sex>(&row.sex, TABLE)?;
            Ok((((age, sex), row.year), row.multiplier))
        })
        .collect::<Result<Vec<_>>>()?;
    YearlyMultipliers::new(TABLE, entries)
}

pub fn fertility_multipliers(rows: &[FertilityMultiplierRow]) -> Result<FertilityMultipliers> {
    const TABLE: &str = "fertility multipliers";
    let entries = rows
        .iter()
        .map(|row| Ok(((parse_label::<AgeGroup>(&row.age_group, TABLE)?, row.year), row.multiplier)))
        .collect::<Result<Vec<_>>>()?;
    YearlyMultipliers::new(TABLE, entries)
}

pub fn immigration_multipliers(rows: &[ImmigrationMultiplierRow]) -> Result<ImmigrationMultipliers> {
    YearlyMultipliers::new(
        "immigration multipliers",
        rows.iter().map(|row| (((), row.year), row.multiplier)),
    )
}

/// Allocation of national net immigration over the cohort space
///
/// Each table year holds one dense fraction vector; a simulated year uses
/// the latest table year not after it. Cohorts absent from a table year get
/// no immigrants.
#[derive(Debug, Clone)]
pub struct ImmigrationFractions {
    by_year: BTreeMap<i32, Vec<f64>>,
}

impl ImmigrationFractions {
    pub const TABLE: &'static str = "immigration fractions";

    pub fn from_rows(space: &CohortSpace, rows: &[ImmigrationFractionRow]) -> Result<Self> {
        let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
        let mut skipped = 0usize;
        for row in rows {
            let key = parse_cohort_key(&row.geoid, &row.age_group, &row.race, &row.sex, Self::TABLE)?;
            let fraction = ensure_non_negative(row.fraction, "fraction", Self::TABLE)?;
            let Some(idx) = space.index_of(&key) else {
                skipped += 1;
                continue;
            };
            by_year
                .entry(row.year)
                .or_insert_with(|| vec![0.0; space.len()])[idx] = fraction;
        }
        warn_skipped(skipped, Self::TABLE);
        Ok(Self { by_year })
    }

    /// Fractions in effect for a simulated year and the table year they come from
    pub fn for_year(&self, year: i32) -> Result<(i32, &[f64])> {
        self.by_year
            .range(..=year)
            .next_back()
            .map(|(table_year, fractions)| (*table_year, fractions.as_slice()))
            .ok_or_else(|| ProjectionError::MissingRate {
                table: Self::TABLE,
                key: "any cohort".to_string(),
                year,
            })
    }
}

/// Observed launch-year net migration as a cohort table
pub fn migration_baseline(
    space: &Arc<CohortSpace>,
    rows: &[MigrationBaselineRow],
) -> Result<CohortTable> {
    const TABLE: &str = "migration baseline";
    let mut table = CohortTable::zeros(Arc::clone(space));
    let mut skipped = 0usize;
    for row in rows {
        let key = parse_cohort_key(&row.geoid, &row.age_group, &row.race, &row.sex, TABLE)?;
        let Some(idx) = space.index_of(&key) else {
            skipped += 1;
            continue;
        };
        table.values_mut()[idx] = row.net_migration;
    }
    warn_skipped(skipped, TABLE);
    Ok(table)
}
