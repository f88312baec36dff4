use std::path::Path;

use county_projection::config::{InputPaths, ScenarioConfig};
use county_projection::inputs::rows::{
    AgeWeightRow, BaselineRow, CoefficientRow, DistanceRow, FertilityMultiplierRow,
    FertilityRateRow, ImmigrationFractionRow, ImmigrationMultiplierRow, MortalityMultiplierRow,
    MortalityRateRow,
};
use county_projection::models::coefficients::{RegressionPart, Term};
use county_projection::{AgeGroup, Category, ProjectionConfig, RawInputs, Race, Sex};

/// Count intercept large enough in magnitude that every flow underflows to zero
pub const NO_MIGRATION: f64 = -1000.0;

/// Hand-specified world with uniform rates and a population function
pub struct TestWorld<'a> {
    pub geoids: &'a [&'a str],
    /// Distance between every county pair, symmetric
    pub distance: fn(usize, usize) -> f64,
    pub launch_year: i32,
    pub horizon_year: i32,
    pub population: fn(usize, AgeGroup, Race, Sex) -> f64,
    pub mortality_per_100k: f64,
    pub fertility_per_1000: f64,
    /// `(term, estimate)` of the count part; the zero part is a large negative intercept
    pub count_terms: &'a [(Term, f64)],
}

impl TestWorld<'_> {
    pub fn raw(&self) -> RawInputs {
        let mut raw = RawInputs {
            baseline: Vec::new(),
            mortality_rates: Vec::new(),
            fertility_rates: Vec::new(),
            mortality_multipliers: Vec::new(),
            fertility_multipliers: Vec::new(),
            immigration_multipliers: Vec::new(),
            immigration_fractions: Vec::new(),
            age_weights: Vec::new(),
            coefficients: Vec::new(),
            distances: Vec::new(),
            migration_baseline: None,
        };

        for (geo, geoid) in self.geoids.iter().enumerate() {
            for &age in AgeGroup::ALL {
                for &race in Race::ALL {
                    for &sex in Sex::ALL {
                        raw.baseline.push(BaselineRow {
                            geoid: (*geoid).to_string(),
                            year: self.launch_year,
                            age_group: age.label().to_string(),
                            race: race.label().to_string(),
                            sex: sex.label().to_string(),
                            population: (self.population)(geo, age, race, sex),
                        });
                        raw.mortality_rates.push(MortalityRateRow {
                            geoid: (*geoid).to_string(),
                            age_group: age.label().to_string(),
                            race: race.label().to_string(),
                            sex: sex.label().to_string(),
                            rate_per_100k: self.mortality_per_100k,
                        });
                        raw.immigration_fractions.push(ImmigrationFractionRow {
                            year: self.launch_year,
                            geoid: (*geoid).to_string(),
                            race: race.label().to_string(),
                            age_group: age.label().to_string(),
                            sex: sex.label().to_string(),
                            fraction: 1.0 / (self.geoids.len() * 216) as f64,
                        });
                    }
                }
            }
            for &race in Race::ALL {
                for age in AgeGroup::FERTILE {
                    raw.fertility_rates.push(FertilityRateRow {
                        geoid: (*geoid).to_string(),
                        race: race.label().to_string(),
                        age_group: age.label().to_string(),
                        rate_per_1000: self.fertility_per_1000,
                    });
                }
            }
            for (other, destination) in self.geoids.iter().enumerate() {
                if other != geo {
                    raw.distances.push(DistanceRow {
                        origin: (*geoid).to_string(),
                        destination: (*destination).to_string(),
                        distance: (self.distance)(geo, other),
                        same_labor_market: false,
                        urban_destination: false,
                    });
                }
            }
        }

        for year in self.launch_year + 1..=self.horizon_year {
            for &age in AgeGroup::ALL {
                for &sex in Sex::ALL {
                    raw.mortality_multipliers.push(MortalityMultiplierRow {
                        age_group: age.label().to_string(),
                        sex: sex.label().to_string(),
                        year,
                        multiplier: 1.0,
                    });
                }
            }
            for age in AgeGroup::FERTILE {
                raw.fertility_multipliers.push(FertilityMultiplierRow {
                    age_group: age.label().to_string(),
                    year,
                    multiplier: 1.0,
                });
            }
            raw.immigration_multipliers.push(ImmigrationMultiplierRow {
                year,
                multiplier: 1.0,
            });
        }

        for &age in AgeGroup::ALL {
            raw.age_weights.push(AgeWeightRow {
                age_group: age.label().to_string(),
                other_age_group: age.label().to_string(),
                rho: 1.0,
            });
            for &race in Race::ALL {
                let coefficient = |part: RegressionPart, term: Term, estimate: f64| CoefficientRow {
                    model: "zinb".to_string(),
                    race: race.label().to_string(),
                    age_group: age.label().to_string(),
                    part: part.label().to_string(),
                    term: term.label().to_string(),
                    estimate,
                    p_value: None,
                };
                raw.coefficients
                    .push(coefficient(RegressionPart::Zero, Term::Intercept, -50.0));
                for &(term, estimate) in self.count_terms {
                    raw.coefficients
                        .push(coefficient(RegressionPart::Count, term, estimate));
                }
            }
        }
        raw
    }
}

/// Configuration for a test run with no international immigration
#[must_use]
pub fn test_config(base_dir: &Path) -> ProjectionConfig {
    ProjectionConfig {
        threads: Some(2),
        ..ProjectionConfig::default()
    }
    .with_scenario(ScenarioConfig {
        name: "test".to_string(),
        model_name: "zinb".to_string(),
        national_net_immigration: 0.0,
    })
    .with_inputs(InputPaths::in_dir(base_dir))
    .with_output_dir(base_dir.join("output"))
}

/// Relative closeness check
pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    let scale = expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= tolerance * scale,
        "expected {expected}, got {actual}"
    );
}
