//! Zero-inflated count regression for one county pair

use crate::algorithm::migration::spatial::PairVariables;
use crate::error::{ProjectionError, Result};
use crate::models::coefficients::{CoefficientVector, LOG_TERM_COUNT};
use crate::models::space::CohortSpace;

/// Prediction of both regression parts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowPrediction {
    /// Probability that the pair has no migrants
    pub zero_probability: f64,
    /// Expected migrants given a non-zero flow
    pub expected_count: f64,
    /// `(1 - zero_probability) * expected_count`
    pub flow: f64,
}

/// `ln(value + 1)`, rejecting arguments outside the log domain
pub fn guarded_log1p(
    variable: &'static str,
    value: f64,
    pair: &PairVariables,
    space: &CohortSpace,
) -> Result<f64> {
    if value.is_finite() && value + 1.0 > 0.0 {
        Ok(value.ln_1p())
    } else {
        Err(domain_error(variable, value, pair, space))
    }
}

fn domain_error(variable: &'static str, value: f64, pair: &PairVariables, space: &CohortSpace) -> ProjectionError {
    ProjectionError::ArithmeticDomain {
        variable,
        value,
        origin: space.geoid(pair.origin).to_string(),
        destination: space.geoid(pair.destination).to_string(),
        year: None,
    }
}

/// Logged spatial variables in `LOG_TERMS` order
pub fn log_terms(pair: &PairVariables, space: &CohortSpace) -> Result<[f64; LOG_TERM_COUNT]> {
    Ok([
        guarded_log1p("Pi", pair.pi, pair, space)?,
        guarded_log1p("Pj", pair.pj, pair, space)?,
        guarded_log1p("Cij+Pj", pair.cij + pair.pj, pair, space)?,
        guarded_log1p("Tij", pair.tij, pair, space)?,
        guarded_log1p("Pj_star", pair.pj_star, pair, space)?,
    ])
}

/// Predict the migrant flow of one pair
///
/// ```text
/// zeroProb      = 1 - exp(-exp(eta_zero))
/// expectedCount = exp(eta_count)
/// flow          = (1 - zeroProb) * expectedCount
/// ```
pub fn predict(
    coefficients: &CoefficientVector,
    pair: &PairVariables,
    space: &CohortSpace,
) -> Result<FlowPrediction> {
    let terms = log_terms(pair, space)?;

    let eta_zero = coefficients
        .zero
        .linear_predictor(&terms, pair.same_labor_market, pair.urban_destination);
    let eta_count = coefficients
        .count
        .linear_predictor(&terms, pair.same_labor_market, pair.urban_destination);

    // exp(-exp(eta)) is the non-zero probability
    let nonzero = (-eta_zero.exp()).exp();
    let expected_count = eta_count.exp();
    let flow = nonzero * expected_count;

    if !flow.is_finite() {
        return Err(domain_error("flow", flow, pair, space));
    }

    Ok(FlowPrediction {
        zero_probability: 1.0 - nonzero,
        expected_count,
        flow,
    })
}
