//! Seeded synthetic input worlds
//!
//! Produces a complete, internally consistent set of input tables for an
//! arbitrary number of counties. Used for smoke runs of the binary and for
//! tests that need realistic shapes without real data.

use std::path::PathBuf;

use itertools::iproduct;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{InputPaths, ProjectionConfig, ScenarioConfig};
use crate::error::{ProjectionError, Result};
use crate::inputs::RawInputs;
use crate::inputs::rows::{
    AgeWeightRow, BaselineRow, CoefficientRow, DistanceRow, FertilityMultiplierRow,
    FertilityRateRow, ImmigrationFractionRow, ImmigrationMultiplierRow, MigrationBaselineRow,
    MortalityMultiplierRow, MortalityRateRow,
};
use crate::models::coefficients::{RegressionPart, Term};
use crate::models::cohort::{AgeGroup, Category, Race, Sex};

/// Deaths per 100,000 by age group
const MORTALITY_PROFILE: [f64; 18] = [
    100.0, 15.0, 15.0, 50.0, 80.0, 90.0, 100.0, 120.0, 180.0, 280.0, 420.0, 650.0, 1_000.0,
    1_500.0, 2_400.0, 3_900.0, 6_500.0, 14_000.0,
];

/// Births per 1,000 women for the fertile age groups
const FERTILITY_PROFILE: [f64; 6] = [18.0, 65.0, 95.0, 98.0, 52.0, 12.0];

/// Population share of each race
const RACE_SHARES: [f64; 6] = [0.58, 0.12, 0.06, 0.01, 0.04, 0.19];

/// Side length of the square the counties are scattered over
const EXTENT: f64 = 500.0;

/// Count-part coefficients for the logged terms and dummies
const COUNT_TERMS: [(Term, f64); 8] = [
    (Term::Intercept, -9.0),
    (Term::Pi, 0.9),
    (Term::Pj, 0.6),
    (Term::CijPj, -0.1),
    (Term::Tij, -0.2),
    (Term::PjStar, 0.05),
    (Term::SameLaborMarket, 0.4),
    (Term::UrbanDestination, 0.2),
];

/// Zero-part coefficients
const ZERO_TERMS: [(Term, f64); 3] = [(Term::Intercept, -1.0), (Term::Pi, -0.05), (Term::Tij, 0.02)];

/// Parameters of a generated world
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticWorld {
    pub counties: usize,
    pub seed: u64,
    pub launch_year: i32,
    pub horizon_year: i32,
    pub model_name: String,
    pub labor_markets: usize,
}

impl Default for SyntheticWorld {
    fn default() -> Self {
        Self {
            counties: 20,
            seed: 42,
            launch_year: 2020,
            horizon_year: 2030,
            model_name: "zinb".to_string(),
            labor_markets: 4,
        }
    }
}

impl SyntheticWorld {
    #[must_use]
    pub fn new(counties: usize) -> Self {
        Self {
            counties,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub const fn with_years(mut self, launch_year: i32, horizon_year: i32) -> Self {
        self.launch_year = launch_year;
        self.horizon_year = horizon_year;
        self
    }

    /// County identifiers, five-digit FIPS style
    #[must_use]
    pub fn geoids(&self) -> Vec<String> {
        (0..self.counties).map(|i| format!("{:05}", 1001 + 2 * i)).collect()
    }

    fn simulated_years(&self) -> impl Iterator<Item = i32> {
        self.launch_year + 1..=self.horizon_year
    }

    /// Configuration matching the world, reading inputs from `base_dir`
    #[must_use]
    pub fn config(&self, raw: &RawInputs, base_dir: impl Into<PathBuf>) -> ProjectionConfig {
        let population: f64 = raw.baseline.iter().map(|r| r.population).sum();
        let mut inputs = InputPaths::in_dir(base_dir);
        inputs.migration_baseline = Some(PathBuf::from("migration_baseline.parquet"));
        ProjectionConfig::default()
            .with_scenario(ScenarioConfig {
                name: "synthetic".to_string(),
                model_name: self.model_name.clone(),
                national_net_immigration: (population * 0.002).round(),
            })
            .with_inputs(inputs)
    }

    /// Generate every input table
    pub fn generate(&self) -> Result<RawInputs> {
        if self.counties < 2 {
            return Err(ProjectionError::InvalidInput(
                "a synthetic world needs at least two counties".to_string(),
            ));
        }
        if self.horizon_year <= self.launch_year {
            return Err(ProjectionError::InvalidInput(format!(
                "horizon year {} must be after launch year {}",
                self.horizon_year, self.launch_year
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let geoids = self.geoids();

        let coordinates: Vec<(f64, f64)> = (0..self.counties)
            .map(|_| (rng.random_range(0.0..EXTENT), rng.random_range(0.0..EXTENT)))
            .collect();
        let sizes: Vec<f64> = (0..self.counties).map(|_| rng.random_range(0.2..5.0)).collect();
        let urban: Vec<bool> = sizes.iter().map(|s| *s > 2.0).collect();
        let band = EXTENT / self.labor_markets.max(1) as f64;
        let market: Vec<usize> = coordinates.iter().map(|(x, _)| (x / band) as usize).collect();

        let mut baseline = Vec::new();
        let mut mortality_rates = Vec::new();
        for (geo, geoid) in geoids.iter().enumerate() {
            for &age in AgeGroup::ALL {
                // Older bands thin out
                let age_factor = if age.index() < 13 {
                    1.0
                } else {
                    0.8_f64.powi(age.index() as i32 - 12)
                };
                for &race in Race::ALL {
                    for &sex in Sex::ALL {
                        let noise = rng.random_range(0.9..1.1);
                        baseline.push(BaselineRow {
                            geoid: geoid.clone(),
                            year: self.launch_year,
                            age_group: age.label().to_string(),
                            race: race.label().to_string(),
                            sex: sex.label().to_string(),
                            population: (2_000.0
                                * sizes[geo]
                                * age_factor
                                * RACE_SHARES[race.index()]
                                * noise)
                                .round(),
                        });
                        let sex_factor = if sex == Sex::Male { 1.1 } else { 0.9 };
                        mortality_rates.push(MortalityRateRow {
                            geoid: geoid.clone(),
                            age_group: age.label().to_string(),
                            race: race.label().to_string(),
                            sex: sex.label().to_string(),
                            rate_per_100k: MORTALITY_PROFILE[age.index()] * sex_factor,
                        });
                    }
                }
            }
        }

        let mut fertility_rates = Vec::new();
        for geoid in &geoids {
            for &race in Race::ALL {
                for (age, base) in AgeGroup::FERTILE.iter().zip(FERTILITY_PROFILE) {
                    fertility_rates.push(FertilityRateRow {
                        geoid: geoid.clone(),
                        race: race.label().to_string(),
                        age_group: age.label().to_string(),
                        rate_per_1000: base * rng.random_range(0.8..1.2),
                    });
                }
            }
        }

        let mut mortality_multipliers = Vec::new();
        let mut fertility_multipliers = Vec::new();
        let mut immigration_multipliers = Vec::new();
        for year in self.simulated_years() {
            let elapsed = year - self.launch_year;
            for &age in AgeGroup::ALL {
                for &sex in Sex::ALL {
                    mortality_multipliers.push(MortalityMultiplierRow {
                        age_group: age.label().to_string(),
                        sex: sex.label().to_string(),
                        year,
                        multiplier: 0.99_f64.powi(elapsed),
                    });
                }
            }
            for age in AgeGroup::FERTILE {
                fertility_multipliers.push(FertilityMultiplierRow {
                    age_group: age.label().to_string(),
                    year,
                    multiplier: 1.0,
                });
            }
            immigration_multipliers.push(ImmigrationMultiplierRow {
                year,
                multiplier: 1.0,
            });
        }

        let total: f64 = baseline.iter().map(|r| r.population).sum();
        let immigration_fractions = baseline
            .iter()
            .map(|row| ImmigrationFractionRow {
                year: self.launch_year,
                geoid: row.geoid.clone(),
                race: row.race.clone(),
                age_group: row.age_group.clone(),
                sex: row.sex.clone(),
                fraction: row.population / total,
            })
            .collect();

        let mut age_weights = Vec::new();
        for &age in AgeGroup::ALL {
            for &other in AgeGroup::ALL {
                let gap = age.index().abs_diff(other.index());
                if gap <= 2 {
                    age_weights.push(AgeWeightRow {
                        age_group: age.label().to_string(),
                        other_age_group: other.label().to_string(),
                        rho: 0.8_f64.powi(gap as i32),
                    });
                }
            }
        }

        let mut coefficients = Vec::new();
        for &race in Race::ALL {
            for &age in AgeGroup::ALL {
                let parts = [
                    (RegressionPart::Zero, &ZERO_TERMS[..]),
                    (RegressionPart::Count, &COUNT_TERMS[..]),
                ];
                for (part, terms) in parts {
                    for &(term, estimate) in terms {
                        coefficients.push(CoefficientRow {
                            model: self.model_name.clone(),
                            race: race.label().to_string(),
                            age_group: age.label().to_string(),
                            part: part.label().to_string(),
                            term: term.label().to_string(),
                            estimate,
                            p_value: Some(rng.random_range(0.0..0.1)),
                        });
                    }
                }
            }
        }

        let distances = iproduct!(0..self.counties, 0..self.counties)
            .filter(|(i, j)| i != j)
            .map(|(i, j)| {
                let (dx, dy) = (
                    coordinates[i].0 - coordinates[j].0,
                    coordinates[i].1 - coordinates[j].1,
                );
                DistanceRow {
                    origin: geoids[i].clone(),
                    destination: geoids[j].clone(),
                    distance: dx.hypot(dy) + 1.0,
                    same_labor_market: market[i] == market[j],
                    urban_destination: urban[j],
                }
            })
            .collect();

        let migration_baseline = baseline
            .iter()
            .map(|row| MigrationBaselineRow {
                geoid: row.geoid.clone(),
                age_group: row.age_group.clone(),
                race: row.race.clone(),
                sex: row.sex.clone(),
                net_migration: row.population * rng.random_range(-0.01..0.01),
            })
            .collect();

        Ok(RawInputs {
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
            migration_baseline: Some(migration_baseline),
        })
    }

    /// Generate the world and write it as Parquet files
    pub fn write(&self, paths: &InputPaths) -> Result<RawInputs> {
        let raw = self.generate()?;
        raw.write(paths)?;
        Ok(raw)
    }
}
