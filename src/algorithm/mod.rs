//! Projection algorithms
//!
//! `projection` holds the cohort-component pipeline and its driver;
//! `migration` holds the gravity-model estimator it calls every year.

pub mod migration;
pub mod projection;
