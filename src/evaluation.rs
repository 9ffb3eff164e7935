//! Leave-one-out evaluation
//!
//! Each epoch samples one case, rebuilds the index without it, estimates its
//! unit price and records the percentage deviation from the known price.
//! Sampling is driven by a seeded generator, so a given seed always
//! reproduces the same samples and the same error.

use serde::Serialize;

use crate::adaptation::adapt;
use crate::casebase::CaseBase;
use crate::index::{format_path, CaseIndex};
use crate::profile::{Profile, Weight};
use crate::retrieval::Retriever;
use crate::types::{Case, Descriptor, DescriptorValue, Query};
use crate::{Error, Result};

/// Outcome of one leave-one-out draw
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Position of the held-out case in the case base
    pub position: usize,
    pub true_price: f64,
    pub estimate: i64,
    /// Signed percentage deviation from the true price
    pub deviation: f64,
    /// Cases backing the retrieved leaf, as positions in the full case base
    pub members: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub epochs: usize,
    /// Mean absolute percentage error
    pub mape: f64,
    pub samples: Vec<Sample>,
}

impl EvaluationReport {
    /// MAPE rounded to two decimals
    pub fn mape_rounded(&self) -> f64 {
        (self.mape * 100.0).round() / 100.0
    }
}

pub struct Evaluator<'a> {
    base: &'a CaseBase,
    profile: &'a Profile,
    seed: u64,
}

impl<'a> Evaluator<'a> {
    pub fn new(base: &'a CaseBase, profile: &'a Profile, seed: u64) -> Self {
        Self {
            base,
            profile,
            seed,
        }
    }

    /// Reject a base that some draw could not evaluate.
    ///
    /// Every case needs a non-zero unit price, and when locations are scored
    /// every location in the base needs a score, because any case may be
    /// retrieved for any other.
    pub fn check_base(&self) -> Result<()> {
        if self.base.len() < 2 {
            return Err(Error::config(format!(
                "leave-one-out needs at least two cases, got {}",
                self.base.len()
            )));
        }

        let scores = match &self.profile.spec(Descriptor::Location).weight {
            Weight::Categorical(scores) if !scores.is_empty() => Some(scores),
            _ => None,
        };

        for (position, case) in self.base.cases().iter().enumerate() {
            match case.unit_price() {
                None => {
                    return Err(Error::DegenerateAggregate {
                        path: format_path(&case_path(case)),
                    })
                }
                Some(price) if price == 0.0 => {
                    return Err(Error::InvalidCase(format!(
                        "case #{} has a zero unit price, deviation is undefined",
                        position
                    )))
                }
                Some(_) => {}
            }

            if let Some(scores) = scores {
                if !scores.contains_key(&case.location) {
                    return Err(Error::WeightLookup {
                        descriptor: Descriptor::Location,
                        value: case.location.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Run `epochs` leave-one-out draws
    pub fn run(&self, epochs: usize) -> Result<EvaluationReport> {
        if epochs == 0 {
            return Err(Error::config("evaluation needs at least one epoch"));
        }
        self.check_base()?;

        let mut rng = fastrand::Rng::with_seed(self.seed);
        let mut samples = Vec::with_capacity(epochs);

        for epoch in 0..epochs {
            let position = rng.usize(..self.base.len());
            let sample = self.hold_out(position)?;

            tracing::debug!(
                epoch,
                position = sample.position,
                true_price = sample.true_price,
                estimate = sample.estimate,
                deviation = sample.deviation,
                "Evaluated held-out case"
            );

            samples.push(sample);
        }

        let mape = samples.iter().map(|s| s.deviation.abs()).sum::<f64>() / epochs as f64;

        Ok(EvaluationReport {
            epochs,
            mape,
            samples,
        })
    }

    /// Estimate one case from an index built over every other case
    pub fn hold_out(&self, position: usize) -> Result<Sample> {
        let case = self
            .base
            .get(position)
            .ok_or_else(|| Error::internal(format!("no case at position {}", position)))?;

        let query = Query::from_case(case);
        let true_price = query.true_unit_price.ok_or_else(|| Error::DegenerateAggregate {
            path: format_path(&case_path(case)),
        })?;
        if true_price == 0.0 {
            return Err(Error::InvalidCase(format!(
                "case #{} has a zero unit price, deviation is undefined",
                position
            )));
        }

        let rest = self.base.without(position)?;
        let index = CaseIndex::build(&rest)?;
        let retrieved = Retriever::new(&index, self.profile).retrieve(&query)?;
        let adaptation = adapt(&query, &retrieved, self.profile)?;

        let deviation = (adaptation.estimate as f64 - true_price) / true_price * 100.0;

        // Positions past the held-out case shifted down by one in `rest`.
        let members = retrieved
            .members
            .iter()
            .map(|&m| if m < position { m } else { m + 1 })
            .collect();

        Ok(Sample {
            position,
            true_price,
            estimate: adaptation.estimate,
            deviation,
            members,
        })
    }
}

fn case_path(case: &Case) -> Vec<DescriptorValue> {
    Descriptor::ORDER.iter().map(|d| case.value(*d)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::WeightSet;
    use std::collections::HashMap;

    fn base() -> CaseBase {
        CaseBase::new(vec![
            Case::new("Cenon", 4, 100.0, 200.0, 2000.0),
            Case::new("Cenon", 4, 100.0, 300.0, 2500.0),
            Case::new("Cenon", 3, 80.0, 200.0, 2000.0),
            Case::new("Lormont", 4, 90.0, 200.0, 1800.0),
        ])
        .unwrap()
    }

    fn profile() -> Profile {
        Profile::from_weights(&WeightSet::default()).unwrap()
    }

    #[test]
    fn test_hold_out_deviation() {
        let base = base();
        let profile = profile();
        let evaluator = Evaluator::new(&base, &profile, 7);

        // Without case #1 the nearest lot for 300 is 200 at 20/unit.
        let sample = evaluator.hold_out(1).unwrap();
        assert_eq!(sample.true_price, 25.0);
        assert_eq!(sample.estimate, 20);
        assert_eq!(sample.deviation, -20.0);
    }

    #[test]
    fn test_hold_out_members_use_full_base_positions() {
        let base = base();
        let profile = profile();
        let evaluator = Evaluator::new(&base, &profile, 7);

        // Case #1 is the only Cenon/4/100/300 case left once #0 is held out.
        let sample = evaluator.hold_out(0).unwrap();
        assert_eq!(sample.members, vec![1]);
        assert_eq!(sample.true_price, 20.0);
        assert_eq!(sample.estimate, 25);
    }

    #[test]
    fn test_zero_price_case_rejected_before_first_epoch() {
        let mut cases = base().cases().to_vec();
        cases.push(Case::new("Lormont", 3, 70.0, 150.0, 0.0));
        let base = CaseBase::new(cases).unwrap();
        let profile = profile();

        let result = Evaluator::new(&base, &profile, 1).run(1);
        assert!(matches!(result, Err(Error::InvalidCase(msg)) if msg.contains("case #4")));
    }

    #[test]
    fn test_zero_surface_case_rejected_before_first_epoch() {
        let mut cases = base().cases().to_vec();
        cases.insert(0, Case::new("Lormont", 3, 0.0, 150.0, 1000.0));
        let base = CaseBase::new(cases).unwrap();
        let profile = profile();

        let result = Evaluator::new(&base, &profile, 1).run(1);
        assert!(matches!(result, Err(Error::DegenerateAggregate { .. })));
    }

    #[test]
    fn test_unscored_location_rejected_before_first_epoch() {
        let base = base();
        let profile = Profile::from_weights(&WeightSet {
            location: HashMap::from([("Cenon".to_string(), 1.0)]),
            ..Default::default()
        })
        .unwrap();

        let result = Evaluator::new(&base, &profile, 1).run(1);
        match result {
            Err(Error::WeightLookup { descriptor, value }) => {
                assert_eq!(descriptor, Descriptor::Location);
                assert_eq!(value, "Lormont");
            }
            other => panic!("Unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_same_seed_same_report() {
        let base = base();
        let profile = profile();

        let first = Evaluator::new(&base, &profile, 42).run(25).unwrap();
        let second = Evaluator::new(&base, &profile, 42).run(25).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.samples.len(), 25);
    }

    #[test]
    fn test_mape_is_mean_absolute_deviation() {
        let base = base();
        let profile = profile();
        let report = Evaluator::new(&base, &profile, 3).run(10).unwrap();

        let expected =
            report.samples.iter().map(|s| s.deviation.abs()).sum::<f64>() / 10.0;
        assert_eq!(report.mape, expected);
        assert_eq!(report.mape_rounded(), (expected * 100.0).round() / 100.0);
    }

    #[test]
    fn test_rejects_degenerate_runs() {
        let profile = profile();
        let single = CaseBase::new(vec![Case::new("Cenon", 4, 100.0, 200.0, 2000.0)]).unwrap();

        assert!(Evaluator::new(&single, &profile, 1).run(1).is_err());
        assert!(Evaluator::new(&base(), &profile, 1).run(0).is_err());
    }
}
