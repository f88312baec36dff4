//! Calibration of model net migration against an observed baseline
//!
//! Delta method: the model's relative change since its first projected year
//! is applied to the observed launch-year value. Where the model and the
//! observation disagree in sign (or the model starts at zero) the two values
//! are averaged instead.

use std::sync::Arc;

use log::info;

use crate::error::{ProjectionError, Result};
use crate::models::table::CohortTable;

/// Calibrate one cell
///
/// # Arguments
/// * `model` - Model net migration in the current year
/// * `model_launch` - Model net migration in the first projected year
/// * `observed` - Observed launch-year net migration
#[must_use]
pub fn calibrate_value(model: f64, model_launch: f64, observed: f64) -> f64 {
    if model_launch * observed > 0.0 {
        observed + observed.abs() * (model - model_launch) / model_launch.abs()
    } else {
        (model + observed) / 2.0
    }
}

/// Stateful calibrator, anchored on the first year it sees
#[derive(Debug, Clone)]
pub struct MigrationCalibrator {
    observed: CohortTable,
    model_launch: Option<CohortTable>,
}

impl MigrationCalibrator {
    #[must_use]
    pub const fn new(observed: CohortTable) -> Self {
        Self {
            observed,
            model_launch: None,
        }
    }

    /// Calibrated net migration for a year of model output
    pub fn calibrate(&mut self, year: i32, model: &CohortTable) -> Result<CohortTable> {
        if !model.same_space(&self.observed) {
            return Err(ProjectionError::Calibration {
                year,
                reason: "migration baseline is over a different cohort space".to_string(),
            });
        }
        let launch = self.model_launch.get_or_insert_with(|| {
            info!(
                "[{year}] Anchoring migration calibration: model {:.1}, observed {:.1}",
                model.total(),
                self.observed.total()
            );
            model.clone()
        });

        let values = model
            .values()
            .iter()
            .zip(launch.values())
            .zip(self.observed.values())
            .map(|((&m, &m0), &b0)| calibrate_value(m, m0, b0))
            .collect();
        CohortTable::from_values(Arc::clone(model.space()), values)
    }

    /// Whether the anchor year has been recorded
    #[must_use]
    pub const fn is_anchored(&self) -> bool {
        self.model_launch.is_some()
    }
}
