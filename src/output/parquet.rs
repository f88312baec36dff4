//! Parquet output of component tables
//!
//! Two layouts are supported:
//! - `Long`: one `<component>/year=<year>.parquet` file per component and
//!   year with columns `geoid, race, sex, age_group, year, value`, written
//!   as each year completes and never rewritten.
//! - `Wide`: one `<component>.parquet` file per component keyed by
//!   `geoid, race, sex, age_group` with a `y<year>` column per year,
//!   written once after the horizon year.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::info;
use serde::{Deserialize, Serialize};

use crate::algorithm::projection::YearSummary;
use crate::config::{OutputConfig, OutputLayout};
use crate::error::util::ensure_directory;
use crate::error::{ProjectionError, Result};
use crate::models::cohort::Category;
use crate::models::space::CohortSpace;
use crate::models::table::CohortTable;
use crate::output::manifest::RunManifest;
use crate::output::{OutputComponent, ProjectionSink, RunInfo, YearTables};
use crate::utils::io::{write_batches, write_rows};

/// One cell of a long-layout output file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    pub geoid: String,
    pub race: String,
    pub sex: String,
    pub age_group: String,
    pub year: i32,
    pub value: f64,
}

/// Long-layout rows of one table
#[must_use]
pub fn long_rows(table: &CohortTable, year: i32) -> Vec<OutputRow> {
    let space = table.space();
    table
        .values()
        .iter()
        .enumerate()
        .map(|(idx, &value)| {
            let (geo, age, race, sex) = space.decompose(idx);
            OutputRow {
                geoid: space.geoid(geo).to_string(),
                race: race.label().to_string(),
                sex: sex.label().to_string(),
                age_group: age.label().to_string(),
                year,
                value,
            }
        })
        .collect()
}

/// Wide-layout record batch of one component series
pub fn wide_batch(space: &CohortSpace, series: &BTreeMap<i32, Vec<f64>>) -> Result<RecordBatch> {
    let mut fields = vec![
        Field::new("geoid", DataType::Utf8, false),
        Field::new("race", DataType::Utf8, false),
        Field::new("sex", DataType::Utf8, false),
        Field::new("age_group", DataType::Utf8, false),
    ];
    let keys: Vec<_> = (0..space.len()).map(|idx| space.decompose(idx)).collect();
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            keys.iter().map(|(geo, ..)| space.geoid(*geo).as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            keys.iter().map(|(_, _, race, _)| race.label()),
        )),
        Arc::new(StringArray::from_iter_values(
            keys.iter().map(|(_, _, _, sex)| sex.label()),
        )),
        Arc::new(StringArray::from_iter_values(
            keys.iter().map(|(_, age, ..)| age.label()),
        )),
    ];

    for (year, values) in series {
        if values.len() != space.len() {
            return Err(ProjectionError::InvalidInput(format!(
                "series for {year} has {} cells, expected {}",
                values.len(),
                space.len()
            )));
        }
        fields.push(Field::new(format!("y{year}"), DataType::Float64, false));
        columns.push(Arc::new(Float64Array::from(values.clone())));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Writes component tables under an output directory
#[derive(Debug)]
pub struct ParquetSink {
    directory: PathBuf,
    layout: OutputLayout,
    components: Vec<OutputComponent>,
    run: Option<RunInfo>,
    wide: BTreeMap<OutputComponent, BTreeMap<i32, Vec<f64>>>,
    files_written: usize,
}

impl ParquetSink {
    /// Create a sink for the configured output
    #[must_use]
    pub fn new(config: &OutputConfig) -> Self {
        let mut components = vec![
            OutputComponent::Population,
            OutputComponent::Deaths,
            OutputComponent::Births,
            OutputComponent::NetMigration,
            OutputComponent::NetImmigration,
        ];
        if config.write_gross_flows {
            components.extend([OutputComponent::Inmigration, OutputComponent::Outmigration]);
        }
        Self {
            directory: config.directory.clone(),
            layout: config.layout,
            components,
            run: None,
            wide: BTreeMap::new(),
            files_written: 0,
        }
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Components this sink persists
    #[must_use]
    pub fn components(&self) -> &[OutputComponent] {
        &self.components
    }

    /// Path of a long-layout file
    #[must_use]
    pub fn long_path(&self, component: OutputComponent, year: i32) -> PathBuf {
        self.directory
            .join(component.label())
            .join(format!("year={year}.parquet"))
    }

    /// Path of a wide-layout file
    #[must_use]
    pub fn wide_path(&self, component: OutputComponent) -> PathBuf {
        self.directory.join(format!("{}.parquet", component.label()))
    }

    fn run(&self) -> Result<&RunInfo> {
        self.run
            .as_ref()
            .ok_or_else(|| ProjectionError::InvalidInput("output sink used before begin".to_string()))
    }
}

impl ProjectionSink for ParquetSink {
    fn begin(&mut self, run: &RunInfo) -> Result<()> {
        ensure_directory(&self.directory, "projection output")?;
        info!(
            "Writing {:?} output for scenario '{}' to {}",
            self.layout,
            run.scenario,
            self.directory.display()
        );
        self.run = Some(run.clone());
        self.wide.clear();
        self.files_written = 0;
        Ok(())
    }

    fn record(&mut self, tables: &YearTables) -> Result<()> {
        self.run()?;
        for &component in &self.components {
            let Some(table) = tables.get(component) else {
                continue;
            };
            match self.layout {
                OutputLayout::Long => {
                    let path = self.long_path(component, tables.year);
                    write_rows(&path, &long_rows(table, tables.year))?;
                    self.files_written += 1;
                }
                OutputLayout::Wide => {
                    self.wide
                        .entry(component)
                        .or_default()
                        .insert(tables.year, table.values().to_vec());
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self, summaries: &[YearSummary]) -> Result<()> {
        let run = self.run()?.clone();
        if self.layout == OutputLayout::Wide {
            for (component, series) in &self.wide {
                let batch = wide_batch(&run.space, series)?;
                write_batches(&self.wide_path(*component), batch.schema(), &[batch])?;
                self.files_written += 1;
            }
        }

        let manifest = RunManifest::new(&run, self.layout, &self.components, summaries);
        manifest.write(&self.directory.join(RunManifest::FILE_NAME))?;
        info!(
            "Wrote {} output files and manifest to {}",
            self.files_written,
            self.directory.display()
        );
        Ok(())
    }
}
