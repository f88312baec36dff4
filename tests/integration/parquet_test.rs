use county_projection::config::OutputLayout;
use county_projection::output::{OutputRow, RunManifest};
use county_projection::utils::io::{read_parquet, read_rows};
use county_projection::{OutputComponent, ParquetSink, RawInputs, Result, SyntheticWorld, run};

use crate::utils::assert_close;

#[test]
fn test_parquet_inputs_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let world = SyntheticWorld::new(3).with_years(2020, 2022);
    let raw = world.generate()?;
    let config = world.config(&raw, dir.path().join("inputs"));
    raw.write(&config.inputs)?;

    let loaded = RawInputs::load(&config.inputs)?;
    assert_eq!(loaded.baseline, raw.baseline);
    assert_eq!(loaded.coefficients, raw.coefficients);
    assert_eq!(loaded.distances, raw.distances);
    assert_eq!(loaded.migration_baseline, raw.migration_baseline);
    Ok(())
}

#[test]
fn test_long_layout_run() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let world = SyntheticWorld::new(4).with_years(2020, 2023);
    let raw = world.generate()?;
    let mut config = world
        .config(&raw, dir.path().join("inputs"))
        .with_output_dir(dir.path().join("output"));
    config.output.write_gross_flows = true;
    raw.write(&config.inputs)?;

    let result = run(&config, 2020, 2023)?;
    assert_eq!(result.summaries.len(), 3);

    let sink = ParquetSink::new(&config.output);
    for year in 2020..=2023 {
        assert!(sink.long_path(OutputComponent::Population, year).exists());
    }
    assert!(sink.long_path(OutputComponent::Outmigration, 2021).exists());
    assert!(!sink.long_path(OutputComponent::Deaths, 2020).exists());

    let rows: Vec<OutputRow> = read_rows(
        &sink.long_path(OutputComponent::Population, 2023),
        "projected population",
    )?;
    assert_eq!(rows.len(), 4 * 216);
    assert!(rows.iter().all(|r| r.year == 2023));
    let total: f64 = rows.iter().map(|r| r.value).sum();
    assert_close(total, result.final_population.total(), 1e-9);

    let manifest = RunManifest::read(&config.output.directory.join(RunManifest::FILE_NAME))?;
    assert_eq!(manifest.scenario, "synthetic");
    assert_eq!(manifest.counties, 4);
    assert_eq!(manifest.years.len(), result.summaries.len());
    for (written, summary) in manifest.years.iter().zip(&result.summaries) {
        assert_eq!(written.year, summary.year);
        assert_close(written.end_population, summary.end_population, 1e-12);
    }
    Ok(())
}

#[test]
fn test_wide_layout_run() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let world = SyntheticWorld::new(3).with_years(2020, 2022);
    let raw = world.generate()?;
    let mut config = world
        .config(&raw, dir.path().join("inputs"))
        .with_output_dir(dir.path().join("wide"));
    config.output.layout = OutputLayout::Wide;
    raw.write(&config.inputs)?;

    run(&config, 2020, 2022)?;

    let sink = ParquetSink::new(&config.output);
    let batches = read_parquet(&sink.wide_path(OutputComponent::Population), "wide population")?;
    let schema = batches[0].schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert!(names.contains(&"y2020"));
    assert!(names.contains(&"y2022"));
    assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 3 * 216);

    let births = read_parquet(&sink.wide_path(OutputComponent::Births), "wide births")?;
    let schema = births[0].schema();
    assert!(schema.fields().iter().all(|f| f.name() != "y2020"));
    Ok(())
}
