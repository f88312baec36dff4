//! Cohort axes and keys
//!
//! A cohort is a (county, age band, race, sex) population bucket. The three
//! demographic axes are fixed, ordered enums; their declaration order is the
//! order used by every dense table in the crate.

use std::fmt;

use cohort_macros::Category;
use serde::{Deserialize, Serialize};

/// A fixed, ordered cohort axis
///
/// Implemented through `#[derive(Category)]`.
pub trait Category: Copy + Eq + fmt::Debug + fmt::Display + Sized + 'static {
    /// Axis name used in messages
    const NAME: &'static str;
    /// Every category in axis order
    const ALL: &'static [Self];

    /// Position on the axis
    fn index(self) -> usize;

    /// Canonical table label
    fn label(self) -> &'static str;

    /// Parse a table label (case-insensitive, aliases accepted)
    fn from_label(label: &str) -> Option<Self>;

    /// Category at a position on the axis
    #[must_use]
    fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// County identifier (FIPS code as text)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeoId(pub String);

impl GeoId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GeoId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Five-year age bands with an open-ended terminal band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Category)]
#[category(name = "age group")]
pub enum AgeGroup {
    #[category(label = "0-4")]
    Age0To4,
    #[category(label = "5-9")]
    Age5To9,
    #[category(label = "10-14")]
    Age10To14,
    #[category(label = "15-19")]
    Age15To19,
    #[category(label = "20-24")]
    Age20To24,
    #[category(label = "25-29")]
    Age25To29,
    #[category(label = "30-34")]
    Age30To34,
    #[category(label = "35-39")]
    Age35To39,
    #[category(label = "40-44")]
    Age40To44,
    #[category(label = "45-49")]
    Age45To49,
    #[category(label = "50-54")]
    Age50To54,
    #[category(label = "55-59")]
    Age55To59,
    #[category(label = "60-64")]
    Age60To64,
    #[category(label = "65-69")]
    Age65To69,
    #[category(label = "70-74")]
    Age70To74,
    #[category(label = "75-79")]
    Age75To79,
    #[category(label = "80-84")]
    Age80To84,
    #[category(label = "85+", alias = "85-")]
    Age85Plus,
}

impl AgeGroup {
    /// The band newborns enter
    pub const YOUNGEST: Self = Self::Age0To4;
    /// The open-ended band that retains its members
    pub const TERMINAL: Self = Self::Age85Plus;
    /// Female reproductive ages used by the fertility component (15-44)
    pub const FERTILE: [Self; 6] = [
        Self::Age15To19,
        Self::Age20To24,
        Self::Age25To29,
        Self::Age30To34,
        Self::Age35To39,
        Self::Age40To44,
    ];

    /// Lower bound of the band in years
    #[must_use]
    pub fn lower_bound(self) -> u32 {
        self.index() as u32 * 5
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::TERMINAL
    }

    #[must_use]
    pub fn is_fertile(self) -> bool {
        Self::FERTILE.contains(&self)
    }

    /// The next-older band, `None` for the terminal band
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }
}

/// Race and ethnicity categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Category)]
#[category(name = "race")]
pub enum Race {
    #[category(label = "NH_WHITE", alias = "WHITE")]
    White,
    #[category(label = "NH_BLACK", alias = "BLACK")]
    Black,
    #[category(label = "NH_ASIAN", alias = "ASIAN")]
    Asian,
    #[category(label = "NH_AIAN", alias = "AIAN")]
    AmericanIndian,
    #[category(label = "NH_OTHER", alias = "OTHER")]
    Other,
    #[category(label = "HISPANIC")]
    Hispanic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Category)]
#[category(name = "sex")]
pub enum Sex {
    #[category(label = "MALE", alias = "M")]
    Male,
    #[category(label = "FEMALE", alias = "F")]
    Female,
}

/// Full cohort key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CohortKey {
    pub geoid: GeoId,
    pub age_group: AgeGroup,
    pub race: Race,
    pub sex: Sex,
}

impl fmt::Display for CohortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.geoid, self.age_group, self.race, self.sex
        )
    }
}
