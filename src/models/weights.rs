//! Age-correlation weights for destination population
//!
//! Migrants of one age band are attracted by destination populations of
//! nearby bands. An externally fit correlation `rho(a, b)` between band `a`
//! and every band `b` is normalised so the largest weight for `a` is 1.

use log::warn;
use smallvec::SmallVec;

use crate::error::{ProjectionError, Result};
use crate::models::cohort::{AgeGroup, Category};

/// Non-zero weights of one target band
pub type WeightRow = SmallVec<[(AgeGroup, f64); 8]>;

#[derive(Debug, Clone)]
pub struct AgeCorrelationWeights {
    rows: Vec<WeightRow>,
}

impl AgeCorrelationWeights {
    /// Build from `(age_group, other_age_group, rho)` triples
    ///
    /// Negative correlations carry no weight. Every age group needs at least
    /// one positive correlation.
    pub fn from_correlations(
        correlations: impl IntoIterator<Item = (AgeGroup, AgeGroup, f64)>,
    ) -> Result<Self> {
        let mut raw = vec![[0.0_f64; AgeGroup::COUNT]; AgeGroup::COUNT];
        let mut negatives = 0usize;
        for (age, other, rho) in correlations {
            if !rho.is_finite() {
                return Err(ProjectionError::InvalidInput(format!(
                    "age correlation for {age}/{other} is not finite"
                )));
            }
            if rho < 0.0 {
                negatives += 1;
            }
            raw[age.index()][other.index()] = rho.max(0.0);
        }
        if negatives > 0 {
            warn!("Ignoring {negatives} negative age correlations");
        }

        let rows = AgeGroup::ALL
            .iter()
            .map(|&age| {
                let row = &raw[age.index()];
                let max = row.iter().copied().fold(0.0_f64, f64::max);
                if max <= 0.0 {
                    return Err(ProjectionError::InvalidInput(format!(
                        "no positive age correlation for age group {age}"
                    )));
                }
                Ok(AgeGroup::ALL
                    .iter()
                    .filter(|other| row[other.index()] > 0.0)
                    .map(|&other| (other, row[other.index()] / max))
                    .collect())
            })
            .collect::<Result<Vec<WeightRow>>>()?;

        Ok(Self { rows })
    }

    /// Each band weighted only by itself
    #[must_use]
    pub fn identity() -> Self {
        Self {
            rows: AgeGroup::ALL
                .iter()
                .map(|&age| std::iter::once((age, 1.0)).collect())
                .collect(),
        }
    }

    /// Normalised weights for a target band
    #[must_use]
    pub fn row(&self, age: AgeGroup) -> &WeightRow {
        &self.rows[age.index()]
    }

    /// Weighted combination of per-band values
    #[must_use]
    pub fn combine(&self, age: AgeGroup, mut value_of: impl FnMut(AgeGroup) -> f64) -> f64 {
        self.row(age).iter().map(|(other, w)| w * value_of(*other)).sum()
    }
}
