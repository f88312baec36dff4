//! Data model of the projection
//!
//! Cohort axes, the dense cohort key space and the tables defined over it,
//! plus the frozen external artifacts consumed by the migration model.

pub mod coefficients;
pub mod cohort;
pub mod distance;
pub mod space;
pub mod table;
pub mod weights;

// Re-export commonly used items
pub use coefficients::{CoefficientEntry, CoefficientVector, MigrationCoefficientSet, RegressionPart, Term};
pub use cohort::{AgeGroup, Category, CohortKey, GeoId, Race, Sex};
pub use distance::{DistancePair, DistanceTable, PairAttributes};
pub use space::{CELLS_PER_COUNTY, CohortSpace};
pub use table::{ClipReport, CohortTable, DeltaOp};
pub use weights::AgeCorrelationWeights;
