//! Integration tests for caseprice
//!
//! These tests run the full pipeline: case base → index → retrieval →
//! adaptation, plus leave-one-out evaluation over the same data.

use caseprice::casebase::CaseBase;
use caseprice::evaluation::Evaluator;
use caseprice::profile::{Profile, WeightSet};
use caseprice::types::{Case, Descriptor, DescriptorValue, Query};
use caseprice::{Error, Estimator};
use std::collections::HashMap;

fn cenon_base() -> CaseBase {
    CaseBase::new(vec![
        Case::new("Cenon", 4, 92.0, 264.0, 2065.0),
        Case::new("Cenon", 4, 92.0, 300.0, 2100.0),
        Case::new("Cenon", 4, 92.0, 500.0, 2300.0),
        Case::new("Cenon", 4, 110.0, 264.0, 2500.0),
        Case::new("Cenon", 4, 85.0, 150.0, 1900.0),
        Case::new("Lormont", 3, 75.0, 200.0, 1500.0),
    ])
    .unwrap()
}

fn weights() -> WeightSet {
    WeightSet {
        location: HashMap::from([("Cenon".to_string(), 2.0), ("Lormont".to_string(), 0.0)]),
        rooms: 1.5,
        surface: 0.05,
        lot: 0.01,
    }
}

/// Query → retrieve the closest 4-room Cenon case → adapt
#[test]
fn test_end_to_end_cenon_estimate() {
    let estimator = Estimator::build(&cenon_base(), Profile::from_weights(&weights()).unwrap())
        .unwrap();

    let query = Query::new()
        .with(Descriptor::Location, "Cenon")
        .with(Descriptor::Rooms, 3i64)
        .with(Descriptor::Surface, 96.0)
        .with(Descriptor::Lot, 264.0);

    let estimate = estimator.estimate(&query).unwrap();

    // Location matches exactly, 4 is the only Cenon room count, 92 is the
    // nearest surface, 264 the nearest lot under it.
    assert_eq!(
        estimate.retrieved.path(),
        vec![
            DescriptorValue::from("Cenon"),
            DescriptorValue::Integer(4),
            DescriptorValue::Numeric(92.0),
            DescriptorValue::Numeric(264.0),
        ]
    );
    assert_eq!(estimate.retrieved.members, vec![0]);
    assert_eq!(estimate.retrieved.unit_price, 2065.0 / 92.0);

    // 22.4456 + (4 - 3) * 1.5 + (92 - 96) * 0.05 = 23.7456
    let deltas: Vec<f64> = estimate.deltas.iter().map(|d| d.delta).collect();
    assert_eq!(deltas[0], 0.0);
    assert_eq!(deltas[1], 1.5);
    assert!((deltas[2] + 0.2).abs() < 1e-12);
    assert_eq!(deltas[3], 0.0);
    assert_eq!(estimate.price, 23);
}

#[test]
fn test_unknown_location_uses_cheapest_branch() {
    let estimator = Estimator::build(&cenon_base(), Profile::from_weights(&weights()).unwrap())
        .unwrap();

    let query = Query::new()
        .with(Descriptor::Location, "Bordeaux")
        .with(Descriptor::Rooms, 3i64)
        .with(Descriptor::Surface, 80.0)
        .with(Descriptor::Lot, 200.0);

    let estimate = estimator.estimate(&query).unwrap();

    // Lormont leaf: 1500 / 75 = 20, cheaper than any Cenon branch. Bordeaux
    // has no score, so location contributes nothing.
    assert_eq!(
        estimate.retrieved.value(Descriptor::Location),
        Some(&DescriptorValue::from("Lormont"))
    );
    assert!(!estimate.retrieved.choices[0].exact);
    assert_eq!(estimate.deltas[0].delta, 0.0);
    // 20 + (75 - 80) * 0.05 = 19.75
    assert_eq!(estimate.price, 19);
}

#[test]
fn test_incomplete_query_rejected_before_retrieval() {
    let estimator = Estimator::build(&cenon_base(), Profile::from_weights(&weights()).unwrap())
        .unwrap();

    let query: Query =
        serde_json::from_str(r#"{"location": "Cenon", "rooms": 3, "surface": 96}"#).unwrap();

    match estimator.estimate(&query) {
        Err(Error::IncompleteQuery(Descriptor::Lot)) => {}
        other => panic!("Unexpected result: {other:?}"),
    }
}

#[test]
fn test_zero_area_case_fails_index_build() {
    let base = CaseBase::new(vec![
        Case::new("Cenon", 4, 92.0, 264.0, 2065.0),
        Case::new("Cenon", 2, 0.0, 264.0, 900.0),
    ])
    .unwrap();

    let result = Estimator::build(&base, Profile::from_weights(&weights()).unwrap());
    assert!(matches!(result, Err(Error::DegenerateAggregate { .. })));
}

#[test]
fn test_evaluation_is_reproducible() {
    let base = cenon_base();
    let profile = Profile::from_weights(&weights()).unwrap();

    let first = Evaluator::new(&base, &profile, 2024).run(40).unwrap();
    let second = Evaluator::new(&base, &profile, 2024).run(40).unwrap();

    assert_eq!(first.samples, second.samples);
    assert_eq!(first.mape, second.mape);
    assert!(first.mape.is_finite());
}
