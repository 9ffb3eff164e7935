//! Weighted linear adaptation of a retrieved price
//!
//! Each descriptor contributes a delta between the retrieved case and the
//! query:
//! - categorical weights: `score[retrieved] - score[query]`, or zero when the
//!   query value has no score
//! - scalar weights: `(retrieved - query) * weight`
//!
//! The estimate is the retrieved unit price plus every delta, truncated.

use serde::Serialize;

use crate::profile::{Profile, Weight};
use crate::retrieval::RetrievedCase;
use crate::types::{Descriptor, DescriptorValue, Query};
use crate::{Error, Result};

/// Contribution of one descriptor to the estimate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delta {
    pub descriptor: Descriptor,
    pub query: DescriptorValue,
    pub retrieved: DescriptorValue,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Adaptation {
    /// Truncated estimated unit price
    pub estimate: i64,
    /// Untruncated retrieved price plus deltas
    pub raw: f64,
    pub deltas: Vec<Delta>,
}

/// Adapt a retrieved case to a query.
///
/// A query value with a categorical score whose retrieved counterpart has
/// none fails with `Error::WeightLookup` instead of contributing zero.
pub fn adapt(query: &Query, retrieved: &RetrievedCase, profile: &Profile) -> Result<Adaptation> {
    let target = query.resolve()?;
    let mut deltas = Vec::with_capacity(profile.specs().len());

    for (spec, wanted) in profile.specs().iter().zip(target) {
        let descriptor = spec.descriptor;
        let found = retrieved
            .value(descriptor)
            .ok_or_else(|| Error::internal(format!("retrieved case has no {} value", descriptor)))?;

        let delta = match &spec.weight {
            Weight::Categorical(scores) => categorical_delta(descriptor, scores, &wanted, found)?,
            Weight::Scalar(weight) => scalar_delta(descriptor, *weight, &wanted, found)?,
        };

        deltas.push(Delta {
            descriptor,
            query: wanted,
            retrieved: found.clone(),
            delta,
        });
    }

    let raw = retrieved.unit_price + deltas.iter().map(|d| d.delta).sum::<f64>();
    if !raw.is_finite() {
        return Err(Error::internal(format!("non-finite estimate {}", raw)));
    }

    Ok(Adaptation {
        estimate: raw.trunc() as i64,
        raw,
        deltas,
    })
}

fn categorical_delta(
    descriptor: Descriptor,
    scores: &std::collections::HashMap<String, f64>,
    wanted: &DescriptorValue,
    found: &DescriptorValue,
) -> Result<f64> {
    let Some(query_score) = wanted.as_str().and_then(|v| scores.get(v)) else {
        return Ok(0.0);
    };

    let found_score = found
        .as_str()
        .and_then(|v| scores.get(v))
        .ok_or_else(|| Error::WeightLookup {
            descriptor,
            value: found.to_string(),
        })?;

    Ok(found_score - query_score)
}

fn scalar_delta(
    descriptor: Descriptor,
    weight: f64,
    wanted: &DescriptorValue,
    found: &DescriptorValue,
) -> Result<f64> {
    match (found.as_f64(), wanted.as_f64()) {
        (Some(r), Some(q)) => Ok((r - q) * weight),
        _ => Err(Error::internal(format!(
            "scalar weight applied to non-numeric {} values",
            descriptor
        ))),
    }
}
