//! Per-descriptor similarity strategies
//!
//! A strategy narrows the keys present at one index level to the candidates
//! nearest to the query value. It never returns an empty selection.

use serde::{Deserialize, Serialize};

use crate::types::{Descriptor, DescriptorValue, ValueKind};
use crate::{Error, Result};

/// Similarity strategy for one descriptor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Similarity {
    /// Keep the identical value, or every candidate when it is absent
    ExactMatch,
    /// Keep every candidate at the minimum absolute difference
    NearestNumeric,
}

/// Candidates selected at one level, as positions into the candidate list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub positions: Vec<usize>,
    pub exact: bool,
}

impl Similarity {
    /// Default strategy for a descriptor's value kind
    pub fn for_descriptor(descriptor: Descriptor) -> Self {
        match descriptor.kind() {
            ValueKind::Categorical => Similarity::ExactMatch,
            ValueKind::Integer | ValueKind::Numeric => Similarity::NearestNumeric,
        }
    }

    /// Whether this strategy can compare values of the given kind
    pub fn supports(&self, kind: ValueKind) -> bool {
        match self {
            Similarity::ExactMatch => true,
            Similarity::NearestNumeric => kind != ValueKind::Categorical,
        }
    }

    /// Select the candidates nearest to `target`.
    ///
    /// Positions keep the candidates' order, which makes downstream
    /// tie-breaking deterministic.
    pub fn select<'a, I>(
        &self,
        descriptor: Descriptor,
        candidates: I,
        target: &DescriptorValue,
    ) -> Result<Selection>
    where
        I: IntoIterator<Item = &'a DescriptorValue>,
    {
        let candidates: Vec<&DescriptorValue> = candidates.into_iter().collect();
        if candidates.is_empty() {
            return Err(Error::EmptyCandidateSet(descriptor));
        }

        match self {
            Similarity::ExactMatch => Ok(exact_match(&candidates, target)),
            Similarity::NearestNumeric => nearest_numeric(descriptor, &candidates, target),
        }
    }
}

fn exact_match(candidates: &[&DescriptorValue], target: &DescriptorValue) -> Selection {
    match candidates.iter().position(|c| *c == target) {
        Some(position) => Selection {
            positions: vec![position],
            exact: true,
        },
        None => Selection {
            positions: (0..candidates.len()).collect(),
            exact: false,
        },
    }
}

fn nearest_numeric(
    descriptor: Descriptor,
    candidates: &[&DescriptorValue],
    target: &DescriptorValue,
) -> Result<Selection> {
    let target = target.as_f64().ok_or_else(|| {
        Error::InvalidQuery(format!("{} expects a numeric value, got {}", descriptor, target))
    })?;

    let distances = candidates
        .iter()
        .map(|c| {
            c.as_f64().map(|x| (x - target).abs()).ok_or_else(|| {
                Error::index(format!("non-numeric key {} at {} level", c, descriptor))
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    let min = distances.iter().copied().fold(f64::INFINITY, f64::min);
    let positions = distances
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == min)
        .map(|(i, _)| i)
        .collect();

    Ok(Selection {
        positions,
        exact: min == 0.0,
    })
}
