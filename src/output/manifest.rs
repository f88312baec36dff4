//! Run manifest written next to the output tables

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::algorithm::projection::YearSummary;
use crate::config::OutputLayout;
use crate::error::Result;
use crate::models::cohort::Category;
use crate::output::{OutputComponent, RunInfo};

/// Description of a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub scenario: String,
    pub model_name: String,
    pub launch_year: i32,
    pub horizon_year: i32,
    pub counties: usize,
    pub layout: OutputLayout,
    pub components: Vec<String>,
    pub written_at: DateTime<Utc>,
    pub years: Vec<YearSummary>,
}

impl RunManifest {
    pub const FILE_NAME: &'static str = "manifest.json";

    #[must_use]
    pub fn new(
        run: &RunInfo,
        layout: OutputLayout,
        components: &[OutputComponent],
        summaries: &[YearSummary],
    ) -> Self {
        Self {
            scenario: run.scenario.clone(),
            model_name: run.model_name.clone(),
            launch_year: run.launch_year,
            horizon_year: run.horizon_year,
            counties: run.space.county_count(),
            layout,
            components: components.iter().map(|c| c.label().to_string()).collect(),
            written_at: Utc::now(),
            years: summaries.to_vec(),
        }
    }

    /// Write as pretty-printed JSON
    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = crate::error::util::safe_read_to_string(path, "run manifest")?;
        Ok(serde_json::from_str(&content)?)
    }
}
