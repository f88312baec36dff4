use std::path::Path;
use std::sync::Arc;

use county_projection::algorithm::projection::{DriverState, MALE_BIRTH_FRACTION};
use county_projection::models::coefficients::Term;
use county_projection::{
    AgeGroup, CancellationToken, Category, ClippingPolicy, CohortTable, MemorySink, OutputComponent,
    ProjectionDriver, ProjectionError, Race, Result, Sex, SyntheticWorld, run_with_inputs,
};

use crate::utils::{NO_MIGRATION, TestWorld, assert_close, test_config};

/// 1000 white women aged 20-24 in county A and 100 white men aged 85+ in
/// county B; 1% mortality, 100 births per 1000
fn single_cohort_world() -> TestWorld<'static> {
    TestWorld {
        geoids: &["A", "B"],
        distance: |_, _| 10.0,
        launch_year: 2020,
        horizon_year: 2021,
        population: |geo, age, race, sex| {
            match (geo, age, race, sex) {
                (0, AgeGroup::Age20To24, Race::White, Sex::Female) => 1000.0,
                (1, AgeGroup::Age85Plus, Race::White, Sex::Male) => 100.0,
                _ => 0.0,
            }
        },
        mortality_per_100k: 1000.0,
        fertility_per_1000: 100.0,
        count_terms: &[(Term::Intercept, NO_MIGRATION)],
    }
}

#[test]
fn test_hand_computed_year() -> Result<()> {
    let world = single_cohort_world();
    let raw = world.raw();
    let config = test_config(Path::new("unused"));
    let mut sink = MemorySink::new();
    let result = run_with_inputs(&config, &raw, 2020, 2021, &mut sink, CancellationToken::new())?;

    // 10 deaths, then 99 births to the 990 survivors, a fifth of whom age
    let population = &result.final_population;
    let white = Race::White;
    assert_close(population.get(0, AgeGroup::Age20To24, white, Sex::Female), 792.0, 1e-12);
    assert_close(population.get(0, AgeGroup::Age25To29, white, Sex::Female), 198.0, 1e-12);
    assert_close(
        population.get(0, AgeGroup::Age0To4, white, Sex::Male),
        99.0 * MALE_BIRTH_FRACTION,
        1e-12,
    );
    assert_close(
        population.get(0, AgeGroup::Age0To4, white, Sex::Female),
        99.0 * (1.0 - MALE_BIRTH_FRACTION),
        1e-12,
    );
    // The open-ended band keeps its survivors
    assert_close(population.get(1, AgeGroup::Age85Plus, white, Sex::Male), 99.0, 1e-12);
    assert_eq!(population.get(1, AgeGroup::Age0To4, white, Sex::Male), 0.0);
    assert_close(population.total(), 1188.0, 1e-12);

    let summary = &result.summaries[0];
    assert_eq!(summary.year, 2021);
    assert_close(summary.deaths, 11.0, 1e-12);
    assert_close(summary.births, 99.0, 1e-12);
    assert_eq!(summary.net_migration, 0.0);
    assert_eq!(summary.net_immigration, 0.0);
    assert_eq!(summary.clipped_cells, 0);
    assert!(summary.balance_error().abs() < 1e-9);

    // Launch year plus one simulated year reached the sink
    assert!(sink.finished);
    assert_eq!(sink.years.len(), 2);
    assert_eq!(
        sink.totals(OutputComponent::Population),
        vec![(2020, 1100.0), (2021, population.total())]
    );
    let deaths = sink.year(2021).and_then(|y| y.get(OutputComponent::Deaths)).unwrap();
    assert_close(deaths.get(0, AgeGroup::Age20To24, white, Sex::Female), 10.0, 1e-12);
    Ok(())
}

/// White women aged 20-24: 1000 in A and 500 in B, one unit apart. Every pair
/// sends `0.01 * (Pi + 1)` migrants.
fn two_county_world() -> TestWorld<'static> {
    TestWorld {
        geoids: &["A", "B"],
        distance: |_, _| 1.0,
        launch_year: 2020,
        horizon_year: 2021,
        population: |geo, age, race, sex| match (geo, age, race, sex) {
            (0, AgeGroup::Age20To24, Race::White, Sex::Female) => 1000.0,
            (1, AgeGroup::Age20To24, Race::White, Sex::Female) => 500.0,
            _ => 0.0,
        },
        mortality_per_100k: 1000.0,
        fertility_per_1000: 100.0,
        count_terms: &[(Term::Intercept, -4.605_170_185_988_091), (Term::Pi, 1.0)],
    }
}

#[test]
fn test_every_stage_in_a_recorded_year() -> Result<()> {
    let mut raw = two_county_world().raw();
    // 300 immigrants to B's white women aged 20-24 and 100 to A's white men aged 25-29
    for row in &mut raw.immigration_fractions {
        let cohort = (row.geoid.as_str(), row.race.as_str(), row.age_group.as_str(), row.sex.as_str());
        row.fraction = match cohort {
            ("B", "NH_WHITE", "20-24", "FEMALE") => 0.75,
            ("A", "NH_WHITE", "25-29", "MALE") => 0.25,
            _ => 0.0,
        };
    }
    let mut config = test_config(Path::new("unused"));
    config.scenario.national_net_immigration = 400.0;
    let mut sink = MemorySink::new();
    let result = run_with_inputs(&config, &raw, 2020, 2021, &mut sink, CancellationToken::new())?;
    let white = Race::White;

    // Mortality leaves 990 and 495 women; immigration lifts B to 795.
    // Migration of 20-24: A sends 9.91 to B, B sends 7.96 to A.
    // Migration of 25-29: only A has people and sends 1.01 men to B.
    let a_women = 990.0 - 9.91 + 7.96;
    let b_women = 795.0 - 7.96 + 9.91;
    let a_men = 100.0 - 1.01;
    let b_men = 1.01;
    let a_births = 0.1 * a_women;
    let b_births = 0.1 * b_women;

    let mut expected = CohortTable::zeros(Arc::clone(result.final_population.space()));
    for (geo, women, men, births) in [(0, a_women, a_men, a_births), (1, b_women, b_men, b_births)] {
        expected.set(geo, AgeGroup::Age20To24, white, Sex::Female, 0.8 * women);
        expected.set(geo, AgeGroup::Age25To29, white, Sex::Female, 0.2 * women);
        expected.set(geo, AgeGroup::Age25To29, white, Sex::Male, 0.8 * men);
        expected.set(geo, AgeGroup::Age30To34, white, Sex::Male, 0.2 * men);
        expected.set(geo, AgeGroup::Age0To4, white, Sex::Male, births * MALE_BIRTH_FRACTION);
        expected.set(geo, AgeGroup::Age0To4, white, Sex::Female, births * (1.0 - MALE_BIRTH_FRACTION));
    }
    for (actual, expected) in result.final_population.values().iter().zip(expected.values()) {
        assert_close(*actual, *expected, 1e-9);
    }
    assert_close(result.final_population.total(), 2063.5, 1e-9);

    let summary = &result.summaries[0];
    assert_close(summary.deaths, 15.0, 1e-12);
    assert_close(summary.net_immigration, 400.0, 1e-12);
    assert!(summary.net_migration.abs() < 1e-9);
    assert_close(summary.gross_migration, 9.91 + 7.96 + 1.01, 1e-9);
    assert_close(summary.births, 178.5, 1e-9);
    assert_eq!(summary.clipped_cells, 0);

    let year = sink.year(2021).unwrap();
    let migration = year.get(OutputComponent::NetMigration).unwrap();
    assert_close(migration.get(0, AgeGroup::Age20To24, white, Sex::Female), 7.96 - 9.91, 1e-9);
    assert_close(migration.get(1, AgeGroup::Age25To29, white, Sex::Male), 1.01, 1e-9);
    assert_eq!(migration.get(1, AgeGroup::Age20To24, white, Sex::Male), 0.0);
    let immigration = year.get(OutputComponent::NetImmigration).unwrap();
    assert_close(immigration.get(1, AgeGroup::Age20To24, white, Sex::Female), 300.0, 1e-12);
    assert_close(immigration.get(0, AgeGroup::Age25To29, white, Sex::Male), 100.0, 1e-12);
    Ok(())
}

/// 100 in every cohort of A and B, 10 per sex of white 20-24 in C, and
/// national emigration of 50 per cohort
fn emigration_world() -> (TestWorld<'static>, f64) {
    let world = TestWorld {
        geoids: &["A", "B", "C"],
        distance: |i, j| (i as f64 - j as f64).abs(),
        launch_year: 2020,
        horizon_year: 2022,
        population: |geo, age, race, _| match geo {
            0 | 1 => 100.0,
            _ if age == AgeGroup::Age20To24 && race == Race::White => 10.0,
            _ => 0.0,
        },
        mortality_per_100k: 0.0,
        fertility_per_1000: 50.0,
        count_terms: &[(Term::Intercept, -4.605_170_185_988_091), (Term::Pi, 1.0)],
    };
    (world, -50.0 * 3.0 * 216.0)
}

#[test]
fn test_negative_immigration_under_both_clipping_policies() -> Result<()> {
    let (world, national) = emigration_world();
    let raw = world.raw();
    let mut per_stage = test_config(Path::new("unused"));
    per_stage.scenario.national_net_immigration = national;
    let end_of_year = per_stage.clone().with_clipping(ClippingPolicy::EndOfYear);

    let a = run_with_inputs(&per_stage, &raw, 2020, 2022, &mut MemorySink::new(), CancellationToken::new())?;
    let b = run_with_inputs(&end_of_year, &raw, 2020, 2022, &mut MemorySink::new(), CancellationToken::new())?;

    for result in [&a, &b] {
        assert_eq!(result.summaries.len(), 2);
        assert!(result.final_population.values().iter().all(|v| *v >= 0.0));
        for summary in &result.summaries {
            assert!(summary.clipped_cells > 0);
            assert!(
                summary.balance_error().abs() < 1e-6 * summary.start_population,
                "year {} off by {}",
                summary.year,
                summary.balance_error()
            );
        }
    }

    // Per-stage clipping reports the immigration that reached the population
    let first = &a.summaries[0];
    assert_eq!(first.end_of_year_clipping, 0.0);
    assert!(first.net_immigration > national);
    // Every one of C's 216 cohorts holds fewer than 50 people
    assert!(first.clipped_cells >= 216);

    // End-of-year clipping applies the whole delta and restores the mass later
    let first = &b.summaries[0];
    assert_close(first.net_immigration, national, 1e-12);
    assert!(first.end_of_year_clipping > 0.0);
    assert!(first.gross_migration > 0.0);
    Ok(())
}

#[test]
fn test_domain_failure_names_the_year() {
    let world = TestWorld {
        count_terms: &[(Term::Intercept, 800.0)],
        ..single_cohort_world()
    };
    let raw = world.raw();
    let config = test_config(Path::new("unused"));
    let err = run_with_inputs(&config, &raw, 2020, 2021, &mut MemorySink::new(), CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, ProjectionError::ArithmeticDomain { variable: "flow", .. }));
    assert_eq!(err.year(), Some(2021));
    assert!(err.to_string().contains("2021"));
}

#[test]
fn test_clipping_policies_agree_without_negatives() -> Result<()> {
    let raw = single_cohort_world().raw();
    let per_stage = test_config(Path::new("unused"));
    let end_of_year = per_stage.clone().with_clipping(ClippingPolicy::EndOfYear);

    let a = run_with_inputs(&per_stage, &raw, 2020, 2021, &mut MemorySink::new(), CancellationToken::new())?;
    let b = run_with_inputs(&end_of_year, &raw, 2020, 2021, &mut MemorySink::new(), CancellationToken::new())?;
    for (x, y) in a.final_population.values().iter().zip(b.final_population.values()) {
        assert_close(*x, *y, 1e-12);
    }
    assert_eq!(b.summaries[0].end_of_year_clipping, 0.0);
    Ok(())
}

#[test]
fn test_balance_holds_every_year() -> Result<()> {
    let world = SyntheticWorld::new(6).with_years(2020, 2025);
    let raw = world.generate()?;
    let config = world.config(&raw, "unused");
    let mut sink = MemorySink::new();
    let result = run_with_inputs(&config, &raw, 2020, 2025, &mut sink, CancellationToken::new())?;

    assert_eq!(result.summaries.len(), 5);
    assert_eq!(result.snapshots.len(), 6);
    assert!(result.snapshot(2023).is_some());
    for (summary, next) in result.summaries.iter().zip(result.summaries.iter().skip(1)) {
        assert_close(next.start_population, summary.end_population, 1e-12);
    }
    for summary in &result.summaries {
        assert!(
            summary.balance_error().abs() < 1e-6 * summary.start_population,
            "year {} off by {}",
            summary.year,
            summary.balance_error()
        );
        assert!(summary.deaths > 0.0);
        assert!(summary.births > 0.0);
        assert!(summary.net_immigration > 0.0);
        assert!(summary.gross_migration > 0.0);
    }
    assert!(result.final_population.values().iter().all(|v| *v >= 0.0));

    // Every year's births split at the fixed sex ratio
    for year in 2021..=2025 {
        let births = sink.year(year).and_then(|y| y.get(OutputComponent::Births)).unwrap();
        let male: f64 = (0..6)
            .flat_map(|geo| Race::ALL.iter().map(move |&race| (geo, race)))
            .map(|(geo, race)| births.get(geo, AgeGroup::Age0To4, race, Sex::Male))
            .sum();
        assert_close(male / births.total(), MALE_BIRTH_FRACTION, 1e-12);
    }
    Ok(())
}

#[test]
fn test_calibrated_run_balances() -> Result<()> {
    let world = SyntheticWorld::new(5).with_years(2020, 2023);
    let raw = world.generate()?;
    let mut config = world.config(&raw, "unused");
    config.migration.calibrate = true;
    let result = run_with_inputs(&config, &raw, 2020, 2023, &mut MemorySink::new(), CancellationToken::new())?;
    for summary in &result.summaries {
        assert!(summary.balance_error().abs() < 1e-6 * summary.start_population);
    }
    Ok(())
}

#[test]
fn test_calibration_without_baseline_is_rejected() -> Result<()> {
    let world = SyntheticWorld::new(3).with_years(2020, 2021);
    let mut raw = world.generate()?;
    raw.migration_baseline = None;
    let mut config = world.config(&raw, "unused");
    config.migration.calibrate = true;
    let err = ProjectionDriver::new(config, &raw, 2020, 2021).unwrap_err();
    assert!(matches!(err, ProjectionError::Config(_)));
    Ok(())
}

#[test]
fn test_stepwise_driver() -> Result<()> {
    let world = TestWorld {
        horizon_year: 2022,
        ..single_cohort_world()
    };
    let raw = world.raw();
    let config = test_config(Path::new("unused"));
    let mut driver = ProjectionDriver::new(config, &raw, 2020, 2022)?;
    let mut sink = MemorySink::new();

    assert_eq!(driver.state(), DriverState::Ready { year: 2021 });
    driver.start(&mut sink)?;
    let first = driver.step(&mut sink)?.unwrap();
    assert_eq!(first.year, 2021);
    assert_eq!(driver.state(), DriverState::Ready { year: 2022 });
    let second = driver.step(&mut sink)?.unwrap();
    assert_eq!(second.year, 2022);
    assert_eq!(driver.state(), DriverState::Finished);
    assert!(driver.step(&mut sink)?.is_none());
    assert_eq!(driver.summaries().len(), 2);
    assert_close(driver.current_population().total(), second.end_population, 1e-12);
    Ok(())
}

#[test]
fn test_cancellation_stops_before_first_year() {
    let raw = single_cohort_world().raw();
    let config = test_config(Path::new("unused"));
    let token = CancellationToken::new();
    token.cancel();
    let err = run_with_inputs(&config, &raw, 2020, 2021, &mut MemorySink::new(), token).unwrap_err();
    assert!(matches!(err, ProjectionError::Cancelled { year: 2021 }));
}

#[test]
fn test_missing_coefficients_fail_before_running() {
    let mut raw = single_cohort_world().raw();
    raw.coefficients.retain(|row| row.race != Race::Hispanic.to_string());
    let config = test_config(Path::new("unused"));
    let err = ProjectionDriver::new(config, &raw, 2020, 2021).unwrap_err();
    assert!(matches!(err, ProjectionError::CoefficientLookup { .. }));
}

#[test]
fn test_missing_baseline_cohort_is_fatal() {
    let mut raw = single_cohort_world().raw();
    raw.baseline.remove(17);
    let config = test_config(Path::new("unused"));
    let err = ProjectionDriver::new(config, &raw, 2020, 2021).unwrap_err();
    assert!(matches!(err, ProjectionError::MissingBaseline { year: 2020, .. }));
}

#[test]
fn test_fraction_drift_is_fatal() {
    let mut raw = single_cohort_world().raw();
    for row in &mut raw.immigration_fractions {
        row.fraction *= 0.9;
    }
    let config = test_config(Path::new("unused"));
    let err = run_with_inputs(&config, &raw, 2020, 2021, &mut MemorySink::new(), CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, ProjectionError::FractionIntegrity { year: 2021, .. }));
}

#[test]
fn test_missing_multiplier_is_fatal() {
    let mut raw = single_cohort_world().raw();
    raw.mortality_multipliers
        .retain(|row| !(row.age_group == "40-44" && row.sex == Sex::Male.to_string()));
    let config = test_config(Path::new("unused"));
    let err = run_with_inputs(&config, &raw, 2020, 2021, &mut MemorySink::new(), CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, ProjectionError::MissingRate { year: 2021, .. }));
}
