use std::sync::Arc;

use proptest::prelude::*;

use county_projection::algorithm::projection::AgingStep;
use county_projection::models::{DistancePair, DistanceTable, PairAttributes};
use county_projection::{
    AgeGroup, Category, CohortSpace, CohortTable, GeoId, InterveningOpportunities, Race, Sex,
    SpatialVariableCalculator,
};

fn one_county() -> Arc<CohortSpace> {
    Arc::new(CohortSpace::new([GeoId::from("01001")]).unwrap())
}

/// Counties at distinct integer positions on a line
fn line(positions: &[u32]) -> (Arc<CohortSpace>, Arc<DistanceTable>) {
    let names: Vec<GeoId> = (0..positions.len()).map(|i| GeoId::new(format!("{i:05}"))).collect();
    let space = Arc::new(CohortSpace::new(names.clone()).unwrap());
    let mut pairs = Vec::new();
    for (i, a) in positions.iter().enumerate() {
        for (j, b) in positions.iter().enumerate() {
            if i != j {
                pairs.push(DistancePair {
                    origin: names[i].clone(),
                    destination: names[j].clone(),
                    attributes: PairAttributes {
                        distance: f64::from(a.abs_diff(*b)),
                        same_labor_market: false,
                        urban_destination: false,
                    },
                });
            }
        }
    }
    let distances = Arc::new(DistanceTable::from_pairs(&space, pairs).unwrap());
    (space, distances)
}

proptest! {
    #[test]
    fn aging_conserves_population(values in prop::collection::vec(0.0..10_000.0_f64, 216)) {
        let table = CohortTable::from_values(one_county(), values).unwrap();
        let aged = AgingStep.apply(&table);
        prop_assert!((aged.total() - table.total()).abs() <= 1e-9 * table.total().max(1.0));

        for &race in Race::ALL {
            for &sex in Sex::ALL {
                let before = |age| table.get(0, age, race, sex);
                let expected = before(AgeGroup::Age85Plus) + 0.2 * before(AgeGroup::Age80To84);
                let after = aged.get(0, AgeGroup::Age85Plus, race, sex);
                prop_assert!((after - expected).abs() <= 1e-9 * expected.max(1.0));
                prop_assert!(aged.get(0, AgeGroup::Age0To4, race, sex) <= before(AgeGroup::Age0To4));
            }
        }
    }

    #[test]
    fn intervening_opportunities_grow_with_distance(
        positions in prop::collection::hash_set(0u32..500, 2..9),
        weights in prop::collection::vec(0.0..1_000.0_f64, 9),
    ) {
        let positions: Vec<u32> = positions.into_iter().collect();
        let n = positions.len();
        let (_, distances) = line(&positions);
        let pj: Vec<f64> = weights[..n].to_vec();
        let pi = pj.clone();

        for opportunities in [InterveningOpportunities::Exclusive, InterveningOpportunities::Inclusive] {
            let calculator = SpatialVariableCalculator::new(Arc::clone(&distances), opportunities);
            let field = calculator.field(pi.clone(), pj.clone()).unwrap();
            for origin in 0..n {
                let mut last = (0.0_f64, -1.0_f64);
                calculator
                    .for_each_pair(&field, origin, |pair| {
                        let (last_distance, last_tij) = last;
                        assert!(pair.distance >= last_distance);
                        assert!(pair.tij >= last_tij);
                        if pair.distance == last_distance {
                            assert_eq!(pair.tij, last_tij);
                        }
                        assert!(pair.cij >= 0.0);
                        last = (pair.distance, pair.tij);
                        Ok(())
                    })
                    .unwrap();
            }
        }
    }

    #[test]
    fn closest_destination_has_no_exclusive_opportunities(
        positions in prop::collection::hash_set(0u32..500, 2..9),
    ) {
        let positions: Vec<u32> = positions.into_iter().collect();
        let n = positions.len();
        let (_, distances) = line(&positions);
        let calculator = SpatialVariableCalculator::new(distances, InterveningOpportunities::Exclusive);
        let field = calculator.field(vec![1.0; n], vec![1.0; n]).unwrap();
        for origin in 0..n {
            let nearest = calculator.index().destinations_by_distance(origin)[0] as usize;
            let pairs = calculator.pairs(&field).unwrap();
            let pair = pairs
                .iter()
                .find(|p| p.origin == origin && p.destination == nearest)
                .unwrap();
            prop_assert_eq!(pair.tij, 0.0);
        }
    }
}
