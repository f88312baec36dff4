//! Domestic migration between counties
//!
//! A gravity / intervening-opportunity model evaluated as a zero-inflated
//! count regression over every ordered county pair.

pub mod calibration;
pub mod engine;
pub mod regression;
pub mod spatial;

pub use calibration::{MigrationCalibrator, calibrate_value};
pub use engine::{GrossFlow, MigrationEngine, MigrationOutcome};
pub use regression::{FlowPrediction, predict};
pub use spatial::{PairVariables, SpatialField, SpatialIndex, SpatialVariableCalculator};
