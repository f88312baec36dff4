//! Loading of the raw input tables
//!
//! `RawInputs::load` reads the files one after another; `load_async` reads
//! them concurrently on tokio's blocking pool and joins the results.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::info;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::InputPaths;
use crate::error::Result;
use crate::inputs::rows::{
    AgeWeightRow, BaselineRow, CoefficientRow, DistanceRow, FertilityMultiplierRow,
    FertilityRateRow, ImmigrationFractionRow, ImmigrationMultiplierRow, MigrationBaselineRow,
    MortalityMultiplierRow, MortalityRateRow,
};
use crate::utils::io::{read_rows, write_rows};

/// Every external input as read from disk, before validation
#[derive(Debug, Clone, Default)]
pub struct RawInputs {
    pub baseline: Vec<BaselineRow>,
    pub mortality_rates: Vec<MortalityRateRow>,
    pub fertility_rates: Vec<FertilityRateRow>,
    pub mortality_multipliers: Vec<MortalityMultiplierRow>,
    pub fertility_multipliers: Vec<FertilityMultiplierRow>,
    pub immigration_multipliers: Vec<ImmigrationMultiplierRow>,
    pub immigration_fractions: Vec<ImmigrationFractionRow>,
    pub age_weights: Vec<AgeWeightRow>,
    pub coefficients: Vec<CoefficientRow>,
    pub distances: Vec<DistanceRow>,
    pub migration_baseline: Option<Vec<MigrationBaselineRow>>,
}

async fn read_rows_blocking<T>(path: PathBuf, purpose: &'static str) -> Result<Vec<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    tokio::task::spawn_blocking(move || read_rows::<T>(&path, purpose)).await?
}

impl RawInputs {
    /// Read every configured table
    pub fn load(paths: &InputPaths) -> Result<Self> {
        let start = Instant::now();
        let raw = Self {
            baseline: read_rows(&paths.resolve(&paths.baseline), "baseline population")?,
            mortality_rates: read_rows(&paths.resolve(&paths.mortality_rates), "mortality rates")?,
            fertility_rates: read_rows(&paths.resolve(&paths.fertility_rates), "fertility rates")?,
            mortality_multipliers: read_rows(
                &paths.resolve(&paths.mortality_multipliers),
                "mortality multipliers",
            )?,
            fertility_multipliers: read_rows(
                &paths.resolve(&paths.fertility_multipliers),
                "fertility multipliers",
            )?,
            immigration_multipliers: read_rows(
                &paths.resolve(&paths.immigration_multipliers),
                "immigration multipliers",
            )?,
            immigration_fractions: read_rows(
                &paths.resolve(&paths.immigration_fractions),
                "immigration fractions",
            )?,
            age_weights: read_rows(&paths.resolve(&paths.age_weights), "age weights")?,
            coefficients: read_rows(&paths.resolve(&paths.coefficients), "migration coefficients")?,
            distances: read_rows(&paths.resolve(&paths.distances), "distances")?,
            migration_baseline: paths
                .migration_baseline
                .as_ref()
                .map(|p| read_rows(&paths.resolve(p), "migration baseline"))
                .transpose()?,
        };
        raw.log_loaded(&paths.base_dir, start);
        Ok(raw)
    }

    /// Read every configured table concurrently
    pub async fn load_async(paths: &InputPaths) -> Result<Self> {
        let start = Instant::now();
        let baseline_path = paths.migration_baseline.as_ref().map(|p| paths.resolve(p));

        let (
            baseline,
            mortality_rates,
            fertility_rates,
            mortality_multipliers,
            fertility_multipliers,
            immigration_multipliers,
            immigration_fractions,
            age_weights,
            coefficients,
            distances,
            migration_baseline,
        ) = futures::try_join!(
            read_rows_blocking(paths.resolve(&paths.baseline), "baseline population"),
            read_rows_blocking(paths.resolve(&paths.mortality_rates), "mortality rates"),
            read_rows_blocking(paths.resolve(&paths.fertility_rates), "fertility rates"),
            read_rows_blocking(paths.resolve(&paths.mortality_multipliers), "mortality multipliers"),
            read_rows_blocking(paths.resolve(&paths.fertility_multipliers), "fertility multipliers"),
            read_rows_blocking(
                paths.resolve(&paths.immigration_multipliers),
                "immigration multipliers"
            ),
            read_rows_blocking(paths.resolve(&paths.immigration_fractions), "immigration fractions"),
            read_rows_blocking(paths.resolve(&paths.age_weights), "age weights"),
            read_rows_blocking(paths.resolve(&paths.coefficients), "migration coefficients"),
            read_rows_blocking(paths.resolve(&paths.distances), "distances"),
            async {
                match baseline_path {
                    Some(path) => read_rows_blocking(path, "migration baseline").await.map(Some),
                    None => Ok(None),
                }
            },
        )?;

        let raw = Self {
            baseline,
            mortality_rates,
            fertility_rates,
            mortality_multipliers,
            fertility_multipliers,
            immigration_multipliers,
            immigration_fractions,
            age_weights,
            coefficients,
            distances,
            migration_baseline,
        };
        raw.log_loaded(&paths.base_dir, start);
        Ok(raw)
    }

    /// Write every table to the locations named by `paths`
    pub fn write(&self, paths: &InputPaths) -> Result<()> {
        fn put<T>(paths: &InputPaths, path: &Path, rows: &[T]) -> Result<()>
        where
            T: Serialize + for<'de> serde::Deserialize<'de>,
        {
            write_rows(&paths.resolve(path), rows)
        }

        put(paths, &paths.baseline, &self.baseline)?;
        put(paths, &paths.mortality_rates, &self.mortality_rates)?;
        put(paths, &paths.fertility_rates, &self.fertility_rates)?;
        put(paths, &paths.mortality_multipliers, &self.mortality_multipliers)?;
        put(paths, &paths.fertility_multipliers, &self.fertility_multipliers)?;
        put(paths, &paths.immigration_multipliers, &self.immigration_multipliers)?;
        put(paths, &paths.immigration_fractions, &self.immigration_fractions)?;
        put(paths, &paths.age_weights, &self.age_weights)?;
        put(paths, &paths.coefficients, &self.coefficients)?;
        put(paths, &paths.distances, &self.distances)?;
        if let (Some(path), Some(rows)) = (&paths.migration_baseline, &self.migration_baseline) {
            put(paths, path, rows)?;
        }
        Ok(())
    }

    fn log_loaded(&self, base_dir: &Path, start: Instant) {
        info!(
            "Loaded inputs from {} in {:?}: {} baseline rows, {} distance pairs, {} coefficients",
            base_dir.display(),
            start.elapsed(),
            self.baseline.len(),
            self.distances.len(),
            self.coefficients.len()
        );
    }
}
