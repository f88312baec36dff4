//! Inter-county distance and classification table
//!
//! Dense `n x n` storage over the counties of a `CohortSpace`. Every ordered
//! pair of distinct counties must be present; self-pairs are never part of
//! the key space.

use log::warn;

use crate::error::{ProjectionError, Result};
use crate::models::cohort::GeoId;
use crate::models::space::CohortSpace;

/// Attributes of one ordered county pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairAttributes {
    /// Distance between the two counties (must be positive)
    pub distance: f64,
    /// Both counties belong to the same labor market / economic area
    pub same_labor_market: bool,
    /// The destination county is classified as urban
    pub urban_destination: bool,
}

/// One row of the external distance table
#[derive(Debug, Clone, PartialEq)]
pub struct DistancePair {
    pub origin: GeoId,
    pub destination: GeoId,
    pub attributes: PairAttributes,
}

#[derive(Debug, Clone)]
pub struct DistanceTable {
    counties: usize,
    distance: Vec<f64>,
    same_labor_market: Vec<bool>,
    urban_destination: Vec<bool>,
}

impl DistanceTable {
    /// Build the dense table for the counties of `space`
    ///
    /// Pairs naming counties outside the space are skipped with a warning.
    pub fn from_pairs(space: &CohortSpace, pairs: impl IntoIterator<Item = DistancePair>) -> Result<Self> {
        let n = space.county_count();
        let mut distance = vec![f64::NAN; n * n];
        let mut same_labor_market = vec![false; n * n];
        let mut urban_destination = vec![false; n * n];
        let mut skipped = 0usize;

        for pair in pairs {
            let (Some(i), Some(j)) = (space.geo_index(&pair.origin), space.geo_index(&pair.destination))
            else {
                skipped += 1;
                continue;
            };
            if i == j {
                return Err(ProjectionError::InvalidInput(format!(
                    "distance table contains self-pair for county {}",
                    pair.origin
                )));
            }
            let d = pair.attributes.distance;
            if !(d.is_finite() && d > 0.0) {
                return Err(ProjectionError::ArithmeticDomain {
                    variable: "Dij",
                    value: d,
                    origin: pair.origin.to_string(),
                    destination: pair.destination.to_string(),
                    year: None,
                });
            }
            let idx = i * n + j;
            distance[idx] = d;
            same_labor_market[idx] = pair.attributes.same_labor_market;
            urban_destination[idx] = pair.attributes.urban_destination;
        }

        if skipped > 0 {
            warn!("Skipped {skipped} distance pairs naming counties outside the baseline");
        }

        for i in 0..n {
            for j in 0..n {
                if i != j && distance[i * n + j].is_nan() {
                    return Err(ProjectionError::MissingSpatialData {
                        origin: space.geoid(i).to_string(),
                        destination: space.geoid(j).to_string(),
                    });
                }
            }
        }

        Ok(Self {
            counties: n,
            distance,
            same_labor_market,
            urban_destination,
        })
    }

    #[must_use]
    pub const fn county_count(&self) -> usize {
        self.counties
    }

    /// Distance from origin `i` to destination `j` (`i != j`)
    #[inline]
    #[must_use]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distance[i * self.counties + j]
    }

    #[inline]
    #[must_use]
    pub fn same_labor_market(&self, i: usize, j: usize) -> bool {
        self.same_labor_market[i * self.counties + j]
    }

    #[inline]
    #[must_use]
    pub fn urban_destination(&self, i: usize, j: usize) -> bool {
        self.urban_destination[i * self.counties + j]
    }

    /// All attributes of a pair, `None` for a self-pair
    #[must_use]
    pub fn pair(&self, i: usize, j: usize) -> Option<PairAttributes> {
        (i != j).then(|| PairAttributes {
            distance: self.distance(i, j),
            same_labor_market: self.same_labor_market(i, j),
            urban_destination: self.urban_destination(i, j),
        })
    }
}
