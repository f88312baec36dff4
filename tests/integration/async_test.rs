use county_projection::{
    CancellationToken, OutputComponent, ParquetSink, ProjectionError, RawInputs, Result,
    SyntheticWorld, run_async,
};

/// Concurrent loading yields the same tables as sequential loading
#[tokio::test]
async fn test_async_load_matches_sync() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let world = SyntheticWorld::new(3).with_years(2020, 2022);
    let raw = world.generate()?;
    let config = world.config(&raw, dir.path());
    raw.write(&config.inputs)?;

    let sequential = RawInputs::load(&config.inputs)?;
    let concurrent = RawInputs::load_async(&config.inputs).await?;
    assert_eq!(sequential.baseline, concurrent.baseline);
    assert_eq!(sequential.mortality_rates, concurrent.mortality_rates);
    assert_eq!(sequential.immigration_fractions, concurrent.immigration_fractions);
    assert_eq!(sequential.age_weights, concurrent.age_weights);
    assert_eq!(sequential.migration_baseline, concurrent.migration_baseline);
    Ok(())
}

#[tokio::test]
async fn test_run_async_writes_output() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let world = SyntheticWorld::new(3).with_years(2020, 2022);
    let raw = world.generate()?;
    let config = world
        .config(&raw, dir.path().join("inputs"))
        .with_output_dir(dir.path().join("output"));
    raw.write(&config.inputs)?;

    let result = run_async(&config, 2020, 2022, CancellationToken::new()).await?;
    assert_eq!(result.horizon_year, 2022);
    assert_eq!(result.summaries.len(), 2);

    let sink = ParquetSink::new(&config.output);
    assert!(sink.long_path(OutputComponent::NetMigration, 2022).exists());
    Ok(())
}

#[tokio::test]
async fn test_missing_input_file_fails() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let world = SyntheticWorld::new(3).with_years(2020, 2021);
    let raw = world.generate()?;
    let config = world.config(&raw, dir.path());
    raw.write(&config.inputs)?;
    std::fs::remove_file(config.inputs.resolve(&config.inputs.distances))?;

    let err = RawInputs::load_async(&config.inputs).await.unwrap_err();
    assert!(!matches!(err, ProjectionError::Task(_)));
    Ok(())
}

#[tokio::test]
async fn test_cancelled_run_async() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let world = SyntheticWorld::new(3).with_years(2020, 2021);
    let raw = world.generate()?;
    let config = world
        .config(&raw, dir.path().join("inputs"))
        .with_output_dir(dir.path().join("output"));
    raw.write(&config.inputs)?;

    let token = CancellationToken::new();
    token.cancel();
    let err = run_async(&config, 2020, 2021, token).await.unwrap_err();
    assert!(matches!(err, ProjectionError::Cancelled { year: 2021 }));
    Ok(())
}
