//! Descriptor profile: one record per descriptor carrying its similarity
//! strategy and its adaptation weight.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::similarity::Similarity;
use crate::types::{Descriptor, ValueKind};
use crate::{Error, Result};

/// Adaptation weight of one descriptor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Weight {
    /// Signed score per categorical value
    Categorical(HashMap<String, f64>),
    /// Signed coefficient per unit of difference
    Scalar(f64),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DescriptorSpec {
    pub descriptor: Descriptor,
    pub similarity: Similarity,
    pub weight: Weight,
}

impl DescriptorSpec {
    fn validate(&self) -> Result<()> {
        let kind = self.descriptor.kind();

        if !self.similarity.supports(kind) {
            return Err(Error::config(format!(
                "{:?} similarity cannot compare {} values of {}",
                self.similarity, kind, self.descriptor
            )));
        }

        match (&self.weight, kind) {
            (Weight::Categorical(scores), ValueKind::Categorical) => {
                if let Some((value, score)) = scores.iter().find(|(_, s)| !s.is_finite()) {
                    return Err(Error::config(format!(
                        "{} weight for {:?} must be finite, got {}",
                        self.descriptor, value, score
                    )));
                }
            }
            (Weight::Scalar(w), ValueKind::Integer | ValueKind::Numeric) => {
                if !w.is_finite() {
                    return Err(Error::config(format!(
                        "{} weight must be finite, got {}",
                        self.descriptor, w
                    )));
                }
            }
            _ => {
                return Err(Error::config(format!(
                    "weight representation does not match {} values of {}",
                    kind, self.descriptor
                )));
            }
        }

        Ok(())
    }
}

/// Ordered descriptor specifications
///
/// Always covers `Descriptor::ORDER`, in that order.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Profile {
    specs: Vec<DescriptorSpec>,
}

impl Profile {
    pub fn new(specs: Vec<DescriptorSpec>) -> Result<Self> {
        let descriptors: Vec<Descriptor> = specs.iter().map(|s| s.descriptor).collect();
        if descriptors != Descriptor::ORDER {
            return Err(Error::config(format!(
                "descriptor specs must follow {:?}, got {:?}",
                Descriptor::ORDER,
                descriptors
            )));
        }

        for spec in &specs {
            spec.validate()?;
        }

        Ok(Self { specs })
    }

    /// Standard strategies with the given weights
    pub fn from_weights(weights: &WeightSet) -> Result<Self> {
        let specs = Descriptor::ORDER
            .iter()
            .map(|descriptor| DescriptorSpec {
                descriptor: *descriptor,
                similarity: Similarity::for_descriptor(*descriptor),
                weight: weights.weight(*descriptor),
            })
            .collect();

        Self::new(specs)
    }

    pub fn specs(&self) -> &[DescriptorSpec] {
        &self.specs
    }

    pub fn spec(&self, descriptor: Descriptor) -> &DescriptorSpec {
        // Position in ORDER matches position in specs, checked in `new`.
        &self.specs[descriptor as usize]
    }
}

/// Flat adaptation weights, as configured and as explored by the tuner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct WeightSet {
    pub location: HashMap<String, f64>,
    pub rooms: f64,
    pub surface: f64,
    pub lot: f64,
}

impl WeightSet {
    pub fn weight(&self, descriptor: Descriptor) -> Weight {
        match descriptor {
            Descriptor::Location => Weight::Categorical(self.location.clone()),
            Descriptor::Rooms => Weight::Scalar(self.rooms),
            Descriptor::Surface => Weight::Scalar(self.surface),
            Descriptor::Lot => Weight::Scalar(self.lot),
        }
    }
}
