//! Configuration for projection runs.
//!
//! All file locations and model switches are carried by an explicit
//! `ProjectionConfig` that the caller injects into the driver. A
//! configuration can be written as JSON; every field has a default.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, Result};
use crate::error::util::safe_read_to_string;

/// Scenario-level assumptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Scenario name, used in logs and output metadata
    pub name: String,
    /// Migration model name used to look up coefficients
    pub model_name: String,
    /// National net immigration before the yearly multiplier is applied
    pub national_net_immigration: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: "baseline".to_string(),
            model_name: "zinb".to_string(),
            national_net_immigration: 0.0,
        }
    }
}

/// Locations of the external input tables (Parquet files)
///
/// Relative paths are resolved against `base_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    pub base_dir: PathBuf,
    pub baseline: PathBuf,
    pub mortality_rates: PathBuf,
    pub fertility_rates: PathBuf,
    pub mortality_multipliers: PathBuf,
    pub fertility_multipliers: PathBuf,
    pub immigration_multipliers: PathBuf,
    pub immigration_fractions: PathBuf,
    pub age_weights: PathBuf,
    pub coefficients: PathBuf,
    pub distances: PathBuf,
    /// Observed net migration for the launch year, used by calibration
    pub migration_baseline: Option<PathBuf>,
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("data"),
            baseline: PathBuf::from("baseline.parquet"),
            mortality_rates: PathBuf::from("mortality_rates.parquet"),
            fertility_rates: PathBuf::from("fertility_rates.parquet"),
            mortality_multipliers: PathBuf::from("mortality_multipliers.parquet"),
            fertility_multipliers: PathBuf::from("fertility_multipliers.parquet"),
            immigration_multipliers: PathBuf::from("immigration_multipliers.parquet"),
            immigration_fractions: PathBuf::from("immigration_fractions.parquet"),
            age_weights: PathBuf::from("age_weights.parquet"),
            coefficients: PathBuf::from("coefficients.parquet"),
            distances: PathBuf::from("distances.parquet"),
            migration_baseline: None,
        }
    }
}

impl InputPaths {
    /// All inputs with the default file names inside `base_dir`
    #[must_use]
    pub fn in_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Resolve a configured path against the base directory
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Layout of persisted component tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// One `(geoid, race, sex, age_group, year, value)` file per component
    /// and year, appended as the run advances
    Long,
    /// One file per component with a column per year, written once at the end
    Wide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub layout: OutputLayout,
    /// Persist gross in- and out-migration next to net migration
    pub write_gross_flows: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            layout: OutputLayout::Long,
            write_gross_flows: false,
        }
    }
}

/// Definition of the distance-weighted intervening opportunities variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterveningOpportunities {
    /// Sum over destinations strictly closer than the current one
    Exclusive,
    /// Sum over destinations up to and including the current one
    Inclusive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    pub intervening_opportunities: InterveningOpportunities,
    /// Zero coefficients whose p-value exceeds this threshold
    pub significance_threshold: Option<f64>,
    /// Rescale model net migration against the observed launch-year baseline
    pub calibrate: bool,
    /// Fan out the race categories over the rayon pool
    pub parallel_races: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            intervening_opportunities: InterveningOpportunities::Exclusive,
            significance_threshold: None,
            calibrate: false,
            parallel_races: true,
        }
    }
}

/// When negative intermediate populations are clipped to zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClippingPolicy {
    /// After every component
    PerStage,
    /// Once, after all four components of a year
    EndOfYear,
}

/// Configuration for a projection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub scenario: ScenarioConfig,
    pub inputs: InputPaths,
    pub output: OutputConfig,
    pub migration: MigrationConfig,
    pub clipping: ClippingPolicy,
    /// Allowed deviation of the immigration fraction sum from 1
    pub fraction_tolerance: f64,
    /// Allowed population balance error per year
    pub balance_tolerance: f64,
    /// Size of the rayon pool, defaults to the number of CPUs
    pub threads: Option<usize>,
    /// Show a progress bar across simulated years
    pub show_progress: bool,
    /// Keep every yearly snapshot in the returned result
    pub retain_snapshots: bool,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            scenario: ScenarioConfig::default(),
            inputs: InputPaths::default(),
            output: OutputConfig::default(),
            migration: MigrationConfig::default(),
            clipping: ClippingPolicy::PerStage,
            fraction_tolerance: 1e-6,
            balance_tolerance: 1.0,
            threads: None,
            show_progress: false,
            retain_snapshots: true,
        }
    }
}

impl ProjectionConfig {
    /// Load a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = safe_read_to_string(path, "projection configuration")?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| ProjectionError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        if !(self.fraction_tolerance.is_finite() && self.fraction_tolerance > 0.0) {
            return Err(ProjectionError::Config(
                "fraction_tolerance must be positive".to_string(),
            ));
        }
        if !(self.balance_tolerance.is_finite() && self.balance_tolerance > 0.0) {
            return Err(ProjectionError::Config(
                "balance_tolerance must be positive".to_string(),
            ));
        }
        if self.threads == Some(0) {
            return Err(ProjectionError::Config("threads must be positive".to_string()));
        }
        if let Some(threshold) = self.migration.significance_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ProjectionError::Config(format!(
                    "significance_threshold {threshold} is not a probability"
                )));
            }
        }
        if self.scenario.model_name.trim().is_empty() {
            return Err(ProjectionError::Config("model_name is empty".to_string()));
        }
        Ok(())
    }

    /// Check a launch/horizon pair against this configuration
    pub fn validate_years(&self, launch_year: i32, horizon_year: i32) -> Result<()> {
        if horizon_year <= launch_year {
            return Err(ProjectionError::Config(format!(
                "horizon year {horizon_year} must be after launch year {launch_year}"
            )));
        }
        Ok(())
    }

    /// Number of rayon threads to use
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get)
    }

    /// Set the scenario
    #[must_use]
    pub fn with_scenario(mut self, scenario: ScenarioConfig) -> Self {
        self.scenario = scenario;
        self
    }

    /// Set the input locations
    #[must_use]
    pub fn with_inputs(mut self, inputs: InputPaths) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set the output directory
    #[must_use]
    pub fn with_output_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.output.directory = directory.into();
        self
    }

    /// Set the clipping policy
    #[must_use]
    pub const fn with_clipping(mut self, clipping: ClippingPolicy) -> Self {
        self.clipping = clipping;
        self
    }
}

impl fmt::Display for ProjectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Projection Configuration:")?;
        writeln!(f, "  Scenario: {}", self.scenario.name)?;
        writeln!(f, "  Migration Model: {}", self.scenario.model_name)?;
        writeln!(
            f,
            "  National Net Immigration: {}",
            self.scenario.national_net_immigration
        )?;
        writeln!(f, "  Inputs: {}", self.inputs.base_dir.display())?;
        writeln!(f, "  Output: {} ({:?})", self.output.directory.display(), self.output.layout)?;
        writeln!(
            f,
            "  Intervening Opportunities: {:?}",
            self.migration.intervening_opportunities
        )?;
        if let Some(threshold) = self.migration.significance_threshold {
            writeln!(f, "  Significance Threshold: {threshold}")?;
        }
        writeln!(f, "  Calibrate: {}", self.migration.calibrate)?;
        writeln!(f, "  Clipping: {:?}", self.clipping)?;
        writeln!(f, "  Threads: {}", self.thread_count())
    }
}
