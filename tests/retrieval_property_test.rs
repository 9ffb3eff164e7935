//! Property tests for the case index and the retriever, checked against a
//! brute-force walk over the raw cases.

use caseprice::casebase::CaseBase;
use caseprice::index::CaseIndex;
use caseprice::profile::{Profile, WeightSet};
use caseprice::retrieval::Retriever;
use caseprice::types::{Case, Descriptor, DescriptorValue, Query};
use proptest::prelude::*;

fn case_strategy() -> impl Strategy<Value = Case> {
    (
        prop::sample::select(vec!["Cenon", "Lormont", "Floirac"]),
        1i64..5,
        prop::sample::select(vec![50.0, 60.0, 70.0, 80.0]),
        prop::sample::select(vec![0.0, 100.0, 200.0, 300.0]),
        1000u32..5000,
    )
        .prop_map(|(location, rooms, surface, lot, price)| {
            Case::new(location, rooms, surface, lot, price as f64)
        })
}

fn query_strategy() -> impl Strategy<Value = Query> {
    (
        prop::sample::select(vec!["Cenon", "Lormont", "Floirac", "Talence"]),
        0i64..6,
        (8u32..19).prop_map(|x| x as f64 * 5.0),
        (0u32..15).prop_map(|x| x as f64 * 25.0),
    )
        .prop_map(|(location, rooms, surface, lot)| {
            Query::new()
                .with(Descriptor::Location, location)
                .with(Descriptor::Rooms, rooms)
                .with(Descriptor::Surface, surface)
                .with(Descriptor::Lot, lot)
        })
}

/// Keys kept at one level, computed directly from the values present.
fn nearest(
    descriptor: Descriptor,
    present: &[DescriptorValue],
    wanted: &DescriptorValue,
) -> Vec<DescriptorValue> {
    if descriptor == Descriptor::Location {
        if present.contains(wanted) {
            return vec![wanted.clone()];
        }
        return present.to_vec();
    }

    let target = wanted.as_f64().unwrap();
    let best = present
        .iter()
        .map(|v| (v.as_f64().unwrap() - target).abs())
        .fold(f64::INFINITY, f64::min);
    present
        .iter()
        .filter(|v| (v.as_f64().unwrap() - target).abs() == best)
        .cloned()
        .collect()
}

/// Every leaf price reachable through nearest candidates at every level.
fn reachable_prices(cases: &[&Case], query: &[DescriptorValue], depth: usize) -> Vec<f64> {
    let Some(&descriptor) = Descriptor::ORDER.get(depth) else {
        let price: f64 = cases.iter().map(|c| c.price).sum();
        let area: f64 = cases.iter().map(|c| c.surface).sum();
        return vec![price / area];
    };

    let mut present: Vec<DescriptorValue> = Vec::new();
    for case in cases {
        let value = case.value(descriptor);
        if !present.contains(&value) {
            present.push(value);
        }
    }

    nearest(descriptor, &present, &query[depth])
        .into_iter()
        .flat_map(|key| {
            let subset: Vec<&Case> = cases
                .iter()
                .copied()
                .filter(|c| c.value(descriptor) == key)
                .collect();
            reachable_prices(&subset, query, depth + 1)
        })
        .collect()
}

proptest! {
    #[test]
    fn retrieved_price_is_minimum_over_near_branches(
        cases in prop::collection::vec(case_strategy(), 1..40),
        query in query_strategy(),
    ) {
        let base = CaseBase::new(cases.clone()).unwrap();
        let index = CaseIndex::build(&base).unwrap();
        let profile = Profile::from_weights(&WeightSet::default()).unwrap();

        let retrieved = Retriever::new(&index, &profile).retrieve(&query).unwrap();

        let resolved = query.resolve().unwrap();
        let all: Vec<&Case> = cases.iter().collect();
        let prices = reachable_prices(&all, &resolved, 0);
        let minimum = prices.iter().copied().fold(f64::INFINITY, f64::min);

        prop_assert_eq!(retrieved.unit_price, minimum);
        prop_assert_eq!(retrieved.leaves_explored, prices.len());
        prop_assert_eq!(retrieved.choices.len(), Descriptor::ORDER.len());
    }

    #[test]
    fn leaves_partition_cases_and_aggregate_exactly(
        cases in prop::collection::vec(case_strategy(), 1..40),
    ) {
        let base = CaseBase::new(cases.clone()).unwrap();
        let index = CaseIndex::build(&base).unwrap();

        let mut seen = vec![0usize; cases.len()];
        for (path, leaf) in index.leaves() {
            prop_assert!(!leaf.members.is_empty());

            for &member in &leaf.members {
                seen[member] += 1;
                let values: Vec<DescriptorValue> =
                    Descriptor::ORDER.iter().map(|d| cases[member].value(*d)).collect();
                prop_assert_eq!(&values, &path);
            }

            let price: f64 = leaf.members.iter().map(|&m| cases[m].price).sum();
            let area: f64 = leaf.members.iter().map(|&m| cases[m].surface).sum();
            prop_assert_eq!(leaf.unit_price, price / area);
        }

        prop_assert!(seen.iter().all(|&count| count == 1));
    }
}
