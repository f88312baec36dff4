//! Spatial interaction variables of the gravity model
//!
//! For one (race, age group) slice the calculator derives, for every ordered
//! county pair, the origin population `Pi`, the age-weighted destination
//! population `Pj`, competing migrants `Cij`, distance-weighted intervening
//! opportunities `Tij` and the labor-market population `Pj_star`.
//!
//! Distance orderings never change during a run, so they are sorted once
//! into a `SpatialIndex` and reused for every slice of every year.

use std::sync::Arc;

use rayon::prelude::*;

use crate::config::InterveningOpportunities;
use crate::error::Result;
use crate::models::distance::DistanceTable;

/// Distance orderings and labor-market groupings, computed once per run
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    counties: usize,
    /// For each origin, the other counties by ascending distance
    by_origin: Vec<Vec<u32>>,
    /// For each destination, the other counties by ascending distance to it
    by_destination: Vec<Vec<u32>>,
    /// For each origin, the other counties of its labor market
    labor_market: Vec<Vec<u32>>,
}

impl SpatialIndex {
    #[must_use]
    pub fn build(distances: &DistanceTable) -> Self {
        let n = distances.county_count();

        let sorted = |fixed: usize, outgoing: bool| {
            let distance = |other: u32| {
                if outgoing {
                    distances.distance(fixed, other as usize)
                } else {
                    distances.distance(other as usize, fixed)
                }
            };
            let mut order: Vec<u32> = (0..n as u32).filter(|&k| k as usize != fixed).collect();
            order.sort_by(|&a, &b| distance(a).total_cmp(&distance(b)).then(a.cmp(&b)));
            order
        };

        let by_origin = (0..n).into_par_iter().map(|i| sorted(i, true)).collect();
        let by_destination = (0..n).into_par_iter().map(|j| sorted(j, false)).collect();
        let labor_market = (0..n)
            .map(|i| {
                (0..n as u32)
                    .filter(|&j| j as usize != i && distances.same_labor_market(i, j as usize))
                    .collect()
            })
            .collect();

        Self {
            counties: n,
            by_origin,
            by_destination,
            labor_market,
        }
    }

    #[must_use]
    pub const fn county_count(&self) -> usize {
        self.counties
    }

    /// Destinations of `origin` by ascending distance
    #[must_use]
    pub fn destinations_by_distance(&self, origin: usize) -> &[u32] {
        &self.by_origin[origin]
    }

    /// Origins by ascending distance to `destination`
    #[must_use]
    pub fn origins_by_distance(&self, destination: usize) -> &[u32] {
        &self.by_destination[destination]
    }

    /// Counties sharing the labor market of `origin`
    #[must_use]
    pub fn labor_market_peers(&self, origin: usize) -> &[u32] {
        &self.labor_market[origin]
    }
}

/// Running totals over a distance ordering
///
/// Entries at equal distance form one group and receive the same total: the
/// sum over strictly closer entries, plus the group itself when `inclusive`.
fn running_totals(
    order: &[u32],
    distance: impl Fn(usize) -> f64,
    value: impl Fn(usize) -> f64,
    inclusive: bool,
    mut emit: impl FnMut(usize, f64) -> Result<()>,
) -> Result<()> {
    let mut closer = 0.0;
    let mut start = 0;
    while start < order.len() {
        let d = distance(order[start] as usize);
        let mut end = start;
        let mut group = 0.0;
        while end < order.len() && distance(order[end] as usize) == d {
            group += value(order[end] as usize);
            end += 1;
        }
        let total = if inclusive { closer + group } else { closer };
        for &k in &order[start..end] {
            emit(k as usize, total)?;
        }
        closer += group;
        start = end;
    }
    Ok(())
}

/// Per-county populations of one (race, age group) slice and the pair
/// quantities derived from them
#[derive(Debug, Clone)]
pub struct SpatialField {
    /// Origin population per county
    pub pi: Vec<f64>,
    /// Age-weighted destination population per county
    pub pj: Vec<f64>,
    /// Labor-market destination population per origin
    pub pj_star: Vec<f64>,
    /// Competing migrants, indexed `destination * n + origin`
    competing: Vec<f64>,
    counties: usize,
}

impl SpatialField {
    /// `Cij` for one ordered pair
    #[inline]
    #[must_use]
    pub fn competing(&self, origin: usize, destination: usize) -> f64 {
        self.competing[destination * self.counties + origin]
    }
}

/// All regression inputs of one ordered county pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairVariables {
    pub origin: usize,
    pub destination: usize,
    pub pi: f64,
    pub pj: f64,
    pub cij: f64,
    pub tij: f64,
    pub pj_star: f64,
    pub distance: f64,
    pub same_labor_market: bool,
    pub urban_destination: bool,
}

/// Builds the directed pair dataset of the gravity model
#[derive(Debug, Clone)]
pub struct SpatialVariableCalculator {
    distances: Arc<DistanceTable>,
    index: Arc<SpatialIndex>,
    opportunities: InterveningOpportunities,
}

impl SpatialVariableCalculator {
    /// Create a calculator, sorting the distance orderings
    #[must_use]
    pub fn new(distances: Arc<DistanceTable>, opportunities: InterveningOpportunities) -> Self {
        let index = Arc::new(SpatialIndex::build(&distances));
        Self {
            distances,
            index,
            opportunities,
        }
    }

    #[must_use]
    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    #[must_use]
    pub fn county_count(&self) -> usize {
        self.index.county_count()
    }

    /// Derive `Pj_star` and `Cij` for a slice
    ///
    /// # Arguments
    /// * `pi` - Origin population per county
    /// * `pj` - Age-weighted destination population per county
    pub fn field(&self, pi: Vec<f64>, pj: Vec<f64>) -> Result<SpatialField> {
        let n = self.county_count();
        debug_assert_eq!(pi.len(), n);
        debug_assert_eq!(pj.len(), n);

        let pj_star = (0..n)
            .map(|i| {
                self.index
                    .labor_market_peers(i)
                    .iter()
                    .map(|&j| pj[j as usize])
                    .sum()
            })
            .collect();

        let mut competing = vec![0.0; n * n];
        competing
            .par_chunks_mut(n.max(1))
            .enumerate()
            .try_for_each(|(j, row)| {
                running_totals(
                    self.index.origins_by_distance(j),
                    |i| self.distances.distance(i, j),
                    |i| pi[i],
                    false,
                    |i, total| {
                        row[i] = total;
                        Ok(())
                    },
                )
            })?;

        Ok(SpatialField {
            pi,
            pj,
            pj_star,
            competing,
            counties: n,
        })
    }

    /// Visit every destination of `origin` in ascending distance order
    pub fn for_each_pair(
        &self,
        field: &SpatialField,
        origin: usize,
        mut visit: impl FnMut(PairVariables) -> Result<()>,
    ) -> Result<()> {
        let inclusive = self.opportunities == InterveningOpportunities::Inclusive;
        running_totals(
            self.index.destinations_by_distance(origin),
            |j| self.distances.distance(origin, j),
            |j| field.pj[j] / self.distances.distance(origin, j),
            inclusive,
            |j, tij| {
                visit(PairVariables {
                    origin,
                    destination: j,
                    pi: field.pi[origin],
                    pj: field.pj[j],
                    cij: field.competing(origin, j),
                    tij,
                    pj_star: field.pj_star[origin],
                    distance: self.distances.distance(origin, j),
                    same_labor_market: self.distances.same_labor_market(origin, j),
                    urban_destination: self.distances.urban_destination(origin, j),
                })
            },
        )
    }

    /// The full directed pair dataset of a slice
    pub fn pairs(&self, field: &SpatialField) -> Result<Vec<PairVariables>> {
        let n = self.county_count();
        let mut pairs = Vec::with_capacity(n * n.saturating_sub(1));
        for origin in 0..n {
            self.for_each_pair(field, origin, |pair| {
                pairs.push(pair);
                Ok(())
            })?;
        }
        Ok(pairs)
    }
}
