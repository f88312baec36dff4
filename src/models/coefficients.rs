//! Frozen migration-model coefficients
//!
//! The coefficient set is built once when the model is loaded and only read
//! afterwards. It is shared between scenario runs behind an `Arc`, so nothing
//! in it is mutable after construction.

use std::sync::Arc;

use cohort_macros::Category;
use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::error::{ProjectionError, Result};
use crate::models::cohort::{AgeGroup, Category, Race};

/// The two parts of the zero-inflated count regression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Category)]
#[category(name = "regression part")]
pub enum RegressionPart {
    /// Probability-of-zero-flow (inflation) model
    #[category(label = "zero", alias = "inflate")]
    Zero,
    /// Expected count given a non-zero flow
    #[category(label = "count")]
    Count,
}

/// Regression terms
///
/// The five logged spatial variables come first, in the order used by
/// `LOG_TERMS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Category)]
#[category(name = "regression term")]
pub enum Term {
    #[category(label = "pi")]
    Pi,
    #[category(label = "pj")]
    Pj,
    #[category(label = "cij_pj")]
    CijPj,
    #[category(label = "tij")]
    Tij,
    #[category(label = "pj_star")]
    PjStar,
    #[category(label = "intercept", alias = "(intercept)")]
    Intercept,
    #[category(label = "same_labor_market")]
    SameLaborMarket,
    #[category(label = "urban_destination")]
    UrbanDestination,
}

/// Number of log-transformed spatial variables
pub const LOG_TERM_COUNT: usize = 5;

/// Terms entering the predictor as `ln(var + 1)`
pub const LOG_TERMS: [Term; LOG_TERM_COUNT] =
    [Term::Pi, Term::Pj, Term::CijPj, Term::Tij, Term::PjStar];

/// One coefficient as read from the external table
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientEntry {
    pub model: String,
    pub race: Race,
    pub age_group: AgeGroup,
    pub part: RegressionPart,
    pub term: Term,
    pub estimate: f64,
    pub p_value: Option<f64>,
}

/// Coefficients of one regression part
#[derive(Debug, Clone, PartialEq)]
pub struct PartCoefficients {
    estimates: [f64; Term::COUNT],
    p_values: [Option<f64>; Term::COUNT],
}

impl PartCoefficients {
    fn empty() -> Self {
        Self {
            estimates: [0.0; Term::COUNT],
            p_values: [None; Term::COUNT],
        }
    }

    /// Build from estimates given in `Term::ALL` order, without significance values
    #[must_use]
    pub fn from_estimates(estimates: [f64; Term::COUNT]) -> Self {
        Self {
            estimates,
            p_values: [None; Term::COUNT],
        }
    }

    #[must_use]
    pub fn estimate(&self, term: Term) -> f64 {
        self.estimates[term.index()]
    }

    #[must_use]
    pub fn p_value(&self, term: Term) -> Option<f64> {
        self.p_values[term.index()]
    }

    /// Linear predictor: intercept + sum of `c_k * ln(var_k + 1)` + dummies
    ///
    /// `log_vars` must already hold `ln(var_k + 1)` in `LOG_TERMS` order.
    #[must_use]
    pub fn linear_predictor(
        &self,
        log_vars: &[f64; LOG_TERM_COUNT],
        same_labor_market: bool,
        urban_destination: bool,
    ) -> f64 {
        let mut eta = self.estimate(Term::Intercept);
        for (term, value) in LOG_TERMS.iter().zip(log_vars) {
            eta += self.estimate(*term) * value;
        }
        if same_labor_market {
            eta += self.estimate(Term::SameLaborMarket);
        }
        if urban_destination {
            eta += self.estimate(Term::UrbanDestination);
        }
        eta
    }
}

/// Both regression parts for one (model, race, age group)
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientVector {
    pub zero: PartCoefficients,
    pub count: PartCoefficients,
}

impl CoefficientVector {
    #[must_use]
    pub const fn new(zero: PartCoefficients, count: PartCoefficients) -> Self {
        Self { zero, count }
    }

    #[must_use]
    pub const fn part(&self, part: RegressionPart) -> &PartCoefficients {
        match part {
            RegressionPart::Zero => &self.zero,
            RegressionPart::Count => &self.count,
        }
    }
}

type CoefficientKey = (String, Race, AgeGroup);

/// Immutable coefficient set keyed by (model name, race, age group)
#[derive(Debug, Clone, Default)]
pub struct MigrationCoefficientSet {
    entries: FxHashMap<CoefficientKey, Arc<CoefficientVector>>,
}

impl MigrationCoefficientSet {
    /// Build the set from table entries
    ///
    /// When `significance_threshold` is given, estimates whose p-value
    /// exceeds it are replaced by zero. Intercepts are never dropped. Every
    /// key must define an intercept for both regression parts, and a term
    /// may appear only once per part.
    pub fn from_entries(
        entries: impl IntoIterator<Item = CoefficientEntry>,
        significance_threshold: Option<f64>,
    ) -> Result<Self> {
        let mut staged: FxHashMap<CoefficientKey, [PartCoefficients; 2]> = FxHashMap::default();
        let mut seen: FxHashMap<CoefficientKey, [[bool; Term::COUNT]; 2]> = FxHashMap::default();
        let mut dropped = 0usize;

        for entry in entries {
            let key = (entry.model.clone(), entry.race, entry.age_group);
            let idx = entry.term.index();
            let terms = &mut seen.entry(key.clone()).or_default()[entry.part.index()];
            if std::mem::replace(&mut terms[idx], true) {
                return Err(ProjectionError::InvalidInput(format!(
                    "duplicate {} {} coefficient for model '{}', race {}, age group {}",
                    entry.part, entry.term, key.0, key.1, key.2
                )));
            }

            let parts = staged
                .entry(key.clone())
                .or_insert_with(|| [PartCoefficients::empty(), PartCoefficients::empty()]);
            let part = &mut parts[entry.part.index()];

            let insignificant = entry.term != Term::Intercept
                && matches!(
                    (significance_threshold, entry.p_value),
                    (Some(threshold), Some(p)) if p > threshold
                );

            part.p_values[idx] = entry.p_value;
            if insignificant {
                dropped += 1;
                part.estimates[idx] = 0.0;
            } else {
                part.estimates[idx] = entry.estimate;
            }
        }

        let mut set = FxHashMap::with_capacity_and_hasher(staged.len(), Default::default());
        for (key, [zero, count]) in staged {
            let intercept = Term::Intercept.index();
            let has_intercepts = seen
                .get(&key)
                .is_some_and(|parts| parts.iter().all(|terms| terms[intercept]));
            if !has_intercepts {
                return Err(ProjectionError::InvalidInput(format!(
                    "coefficients for model '{}', race {}, age group {} lack an intercept",
                    key.0, key.1, key.2
                )));
            }
            set.insert(key, Arc::new(CoefficientVector::new(zero, count)));
        }

        if dropped > 0 {
            debug!("Zeroed {dropped} coefficients above the significance threshold");
        }
        info!("Loaded migration coefficients for {} model keys", set.len());

        Ok(Self { entries: set })
    }

    /// Build a set directly from coefficient vectors
    #[must_use]
    pub fn from_vectors(
        vectors: impl IntoIterator<Item = ((String, Race, AgeGroup), CoefficientVector)>,
    ) -> Self {
        Self {
            entries: vectors
                .into_iter()
                .map(|(key, vector)| (key, Arc::new(vector)))
                .collect(),
        }
    }

    /// Look up the coefficients for one model key
    pub fn get(&self, model: &str, race: Race, age_group: AgeGroup) -> Result<Arc<CoefficientVector>> {
        self.entries
            .get(&(model.to_string(), race, age_group))
            .cloned()
            .ok_or_else(|| ProjectionError::CoefficientLookup {
                model: model.to_string(),
                race: race.to_string(),
                age_group: age_group.to_string(),
            })
    }

    /// Check that every (race, age group) pair is covered for a model
    pub fn ensure_complete(&self, model: &str) -> Result<()> {
        for &race in Race::ALL {
            for &age in AgeGroup::ALL {
                self.get(model, race, age)?;
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
