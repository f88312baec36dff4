use std::path::Path;
use std::sync::Arc;

use county_projection::algorithm::migration::MigrationEngine;
use county_projection::algorithm::projection::CohortStateStore;
use county_projection::models::coefficients::Term;
use county_projection::{
    AgeGroup, InterveningOpportunities, ProjectionInputs, Race, Result, Sex,
    SpatialVariableCalculator, SyntheticWorld,
};

use crate::utils::{TestWorld, assert_close, test_config};

/// Counties A, B and C on a line at 0, 1 and 3
const POSITIONS: [f64; 3] = [0.0, 1.0, 3.0];

/// White 20-24 only: A has 100 women, B 100 of each sex, C 25 of each sex
fn line_world() -> TestWorld<'static> {
    TestWorld {
        geoids: &["A", "B", "C"],
        distance: |i, j| (POSITIONS[i] - POSITIONS[j]).abs(),
        launch_year: 2020,
        horizon_year: 2021,
        population: |geo, age, race, sex| {
            if age != AgeGroup::Age20To24 || race != Race::White {
                return 0.0;
            }
            match (geo, sex) {
                (0, Sex::Female) => 100.0,
                (0, Sex::Male) => 0.0,
                (1, _) => 100.0,
                (_, _) => 25.0,
            }
        },
        mortality_per_100k: 0.0,
        fertility_per_1000: 0.0,
        count_terms: &[(Term::Intercept, -5.0), (Term::Pi, 1.0), (Term::Tij, 1.0)],
    }
}

fn engine_and_store(world: &TestWorld<'_>) -> Result<(MigrationEngine, CohortStateStore)> {
    let raw = world.raw();
    let config = test_config(Path::new("unused"));
    let store = CohortStateStore::load(&raw.baseline, world.launch_year, config.clipping)?;
    let inputs = ProjectionInputs::assemble(&raw, store.space(), &config)?;
    let engine = MigrationEngine::new(
        "zinb",
        Arc::clone(&inputs.coefficients),
        inputs.age_weights.clone(),
        Arc::clone(&inputs.distances),
        &config.migration,
    );
    Ok((engine, store))
}

#[test]
fn test_spatial_variables_on_a_line() -> Result<()> {
    let (engine, store) = engine_and_store(&line_world())?;
    let field = engine.slice_field(store.current(), Race::White, AgeGroup::Age20To24)?;
    assert_eq!(field.pi, vec![100.0, 200.0, 50.0]);
    assert_eq!(field.pj, vec![100.0, 200.0, 50.0]);

    let pairs = engine.calculator().pairs(&field)?;
    let find = |o: usize, d: usize| {
        pairs
            .iter()
            .find(|p| p.origin == o && p.destination == d)
            .copied()
            .unwrap()
    };

    // Intervening opportunities: Pj / Dij over strictly closer destinations
    assert_eq!(find(0, 1).tij, 0.0);
    assert_eq!(find(0, 2).tij, 200.0);
    assert_eq!(find(1, 0).tij, 0.0);
    assert_eq!(find(1, 2).tij, 100.0);
    assert_eq!(find(2, 1).tij, 0.0);
    assert_eq!(find(2, 0).tij, 100.0);

    // Competing migrants: Pi of origins strictly closer to the destination
    assert_eq!(find(0, 2).cij, 200.0);
    assert_eq!(find(1, 2).cij, 0.0);
    assert_eq!(find(2, 0).cij, 200.0);
    assert_eq!(find(2, 1).cij, 100.0);
    assert_eq!(find(0, 1).cij, 0.0);
    Ok(())
}

#[test]
fn test_hand_computed_flows() -> Result<()> {
    let (mut engine, store) = engine_and_store(&line_world())?;
    let outcome = engine.project(2021, store.current())?;

    // flow = exp(-5) * (Pi + 1) * (Tij + 1)
    let scale = (-5.0_f64).exp();
    let out = [20402.0 * scale, 20502.0 * scale, 5202.0 * scale];
    let inflow = [5352.0 * scale, 152.0 * scale, 40602.0 * scale];

    let age = AgeGroup::Age20To24;
    let race = Race::White;
    for geo in 0..3 {
        assert_close(outcome.outmigration.both_sexes(geo, age, race), out[geo], 1e-12);
        assert_close(outcome.inmigration.both_sexes(geo, age, race), inflow[geo], 1e-12);
        assert_close(
            outcome.net.both_sexes(geo, age, race),
            inflow[geo] - out[geo],
            1e-12,
        );
    }

    // A has no men, so nothing it sends is male
    assert_eq!(outcome.outmigration.get(0, age, race, Sex::Male), 0.0);
    assert_close(outcome.outmigration.get(1, age, race, Sex::Male), out[1] / 2.0, 1e-12);
    // Inflow to B comes from A (all female) and C (half male)
    assert_close(
        outcome.inmigration.get(1, age, race, Sex::Male),
        51.0 * scale / 2.0,
        1e-12,
    );

    assert_close(outcome.net.total(), 0.0, 1e-9);
    assert_close(outcome.gross_total(), 46106.0 * scale, 1e-12);
    Ok(())
}

#[test]
fn test_inclusive_opportunities_shift_every_tij() -> Result<()> {
    let (engine, store) = engine_and_store(&line_world())?;
    let field = engine.slice_field(store.current(), Race::White, AgeGroup::Age20To24)?;

    let raw = line_world().raw();
    let config = test_config(Path::new("unused"));
    let inputs = ProjectionInputs::assemble(&raw, store.space(), &config)?;
    let inclusive =
        SpatialVariableCalculator::new(Arc::clone(&inputs.distances), InterveningOpportunities::Inclusive);

    let exclusive_pairs = engine.calculator().pairs(&field)?;
    let inclusive_pairs = inclusive.pairs(&field)?;
    for (e, i) in exclusive_pairs.iter().zip(&inclusive_pairs) {
        assert_eq!((e.origin, e.destination), (i.origin, i.destination));
        assert_close(i.tij - e.tij, field.pj[e.destination] / e.distance, 1e-12);
        assert_eq!(e.cij, i.cij);
    }
    Ok(())
}

#[test]
fn test_synthetic_world_is_closed() -> Result<()> {
    let world = SyntheticWorld::new(8).with_years(2020, 2021);
    let raw = world.generate()?;
    let config = world.config(&raw, "unused");
    let store = CohortStateStore::load(&raw.baseline, 2020, config.clipping)?;
    let inputs = ProjectionInputs::assemble(&raw, store.space(), &config)?;
    let mut engine = MigrationEngine::new(
        "zinb",
        Arc::clone(&inputs.coefficients),
        inputs.age_weights.clone(),
        Arc::clone(&inputs.distances),
        &config.migration,
    );

    let outcome = engine.project(2021, store.current())?;
    assert!(outcome.gross_total() > 0.0);
    assert!(outcome.net.total().abs() < 1e-9 * outcome.gross_total());
    assert_close(outcome.inmigration.total(), outcome.outmigration.total(), 1e-12);

    // Gross flows of one slice reproduce that slice's out-migration
    let flows = engine.gross_flows(store.current(), Race::Hispanic, AgeGroup::Age30To34)?;
    let from_flows: f64 = flows.iter().map(|f| f.flow).sum();
    let from_table: f64 = (0..8)
        .map(|geo| outcome.outmigration.both_sexes(geo, AgeGroup::Age30To34, Race::Hispanic))
        .sum();
    assert_close(from_flows, from_table, 1e-9);
    Ok(())
}
