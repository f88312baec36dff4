//! Dense cohort key space
//!
//! Every county carries the full cross of age group, race and sex, so a
//! table over the space is a flat vector and the "no missing keys"
//! invariant holds by construction.

use rustc_hash::FxHashMap;

use crate::error::{ProjectionError, Result};
use crate::models::cohort::{AgeGroup, Category, CohortKey, GeoId, Race, Sex};

/// Cells per county: age groups x races x sexes
pub const CELLS_PER_COUNTY: usize = AgeGroup::COUNT * Race::COUNT * Sex::COUNT;

/// Ordered set of counties and the index arithmetic over the cohort axes
///
/// Layout is county-major, then age group, race, sex.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortSpace {
    geoids: Vec<GeoId>,
    lookup: FxHashMap<GeoId, usize>,
}

impl CohortSpace {
    /// Build a space from county identifiers (sorted and de-duplicated)
    pub fn new(geoids: impl IntoIterator<Item = GeoId>) -> Result<Self> {
        let mut geoids: Vec<GeoId> = geoids.into_iter().collect();
        geoids.sort();
        geoids.dedup();

        if geoids.is_empty() {
            return Err(ProjectionError::InvalidInput(
                "cohort space needs at least one county".to_string(),
            ));
        }

        let lookup = geoids
            .iter()
            .enumerate()
            .map(|(i, g)| (g.clone(), i))
            .collect();

        Ok(Self { geoids, lookup })
    }

    /// Number of counties
    #[must_use]
    pub fn county_count(&self) -> usize {
        self.geoids.len()
    }

    /// Number of cells in a table over this space
    #[must_use]
    pub fn len(&self) -> usize {
        self.geoids.len() * CELLS_PER_COUNTY
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.geoids.is_empty()
    }

    #[must_use]
    pub fn geoids(&self) -> &[GeoId] {
        &self.geoids
    }

    #[must_use]
    pub fn geoid(&self, geo: usize) -> &GeoId {
        &self.geoids[geo]
    }

    /// Position of a county, `None` if it is not part of the space
    #[must_use]
    pub fn geo_index(&self, geoid: &GeoId) -> Option<usize> {
        self.lookup.get(geoid).copied()
    }

    /// Flat index of a cohort cell
    #[inline]
    #[must_use]
    pub fn index(&self, geo: usize, age: AgeGroup, race: Race, sex: Sex) -> usize {
        ((geo * AgeGroup::COUNT + age.index()) * Race::COUNT + race.index()) * Sex::COUNT
            + sex.index()
    }

    /// Flat index of a cohort key, `None` for an unknown county
    #[must_use]
    pub fn index_of(&self, key: &CohortKey) -> Option<usize> {
        self.geo_index(&key.geoid)
            .map(|geo| self.index(geo, key.age_group, key.race, key.sex))
    }

    /// Split a flat index into its axis positions
    #[must_use]
    pub fn decompose(&self, idx: usize) -> (usize, AgeGroup, Race, Sex) {
        let sex = idx % Sex::COUNT;
        let rest = idx / Sex::COUNT;
        let race = rest % Race::COUNT;
        let rest = rest / Race::COUNT;
        let age = rest % AgeGroup::COUNT;
        let geo = rest / AgeGroup::COUNT;
        (
            geo,
            AgeGroup::ALL[age],
            Race::ALL[race],
            Sex::ALL[sex],
        )
    }

    /// Key of the cell at a flat index
    #[must_use]
    pub fn key_at(&self, idx: usize) -> CohortKey {
        let (geo, age_group, race, sex) = self.decompose(idx);
        CohortKey {
            geoid: self.geoids[geo].clone(),
            age_group,
            race,
            sex,
        }
    }

    /// Iterate every key in layout order
    pub fn keys(&self) -> impl Iterator<Item = CohortKey> + '_ {
        (0..self.len()).map(|idx| self.key_at(idx))
    }
}
