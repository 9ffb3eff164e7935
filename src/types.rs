//! Core types for caseprice

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::{Error, Result};

/// Descriptor used both to index the case base and to drive retrieval.
///
/// The declaration order is the index depth order: location at the root,
/// lot size at the leaves.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Descriptor {
    Location,
    Rooms,
    Surface,
    Lot,
}

impl Descriptor {
    /// Fixed descriptor order shared by the index, the retriever and the adapter.
    pub const ORDER: [Descriptor; 4] = [
        Descriptor::Location,
        Descriptor::Rooms,
        Descriptor::Surface,
        Descriptor::Lot,
    ];

    pub fn kind(&self) -> ValueKind {
        match self {
            Descriptor::Location => ValueKind::Categorical,
            Descriptor::Rooms => ValueKind::Integer,
            Descriptor::Surface | Descriptor::Lot => ValueKind::Numeric,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Descriptor::Location => "location",
            Descriptor::Rooms => "rooms",
            Descriptor::Surface => "surface",
            Descriptor::Lot => "lot",
        }
    }

    /// Convert a value into this descriptor's kind.
    ///
    /// JSON does not distinguish `96` from `96.0`, so integral numbers are
    /// accepted for either numeric kind.
    pub fn coerce(&self, value: &DescriptorValue) -> Result<DescriptorValue> {
        let invalid = || {
            Error::InvalidQuery(format!(
                "{} expects a {} value, got {}",
                self,
                self.kind(),
                value
            ))
        };

        match (self.kind(), value) {
            (ValueKind::Categorical, DescriptorValue::Categorical(_)) => Ok(value.clone()),
            (ValueKind::Integer, DescriptorValue::Integer(_)) => Ok(value.clone()),
            (ValueKind::Integer, DescriptorValue::Numeric(x))
                if x.is_finite() && x.fract() == 0.0 =>
            {
                Ok(DescriptorValue::Integer(*x as i64))
            }
            (ValueKind::Numeric, DescriptorValue::Numeric(x)) if x.is_finite() => {
                Ok(DescriptorValue::Numeric(*x))
            }
            (ValueKind::Numeric, DescriptorValue::Integer(i)) => {
                Ok(DescriptorValue::Numeric(*i as f64))
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value kind carried by a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Categorical,
    Integer,
    Numeric,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Categorical => f.write_str("categorical"),
            ValueKind::Integer => f.write_str("integer"),
            ValueKind::Numeric => f.write_str("numeric"),
        }
    }
}

/// Descriptor value types
///
/// Used as index keys, so equality and hashing are total: numeric values
/// compare by bit pattern after folding `-0.0` into `0.0`. Non-finite
/// numbers never reach the index (cases and queries reject them).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DescriptorValue {
    Categorical(String),
    Integer(i64),
    Numeric(f64),
}

impl DescriptorValue {
    /// Numeric view of the value, `None` for categorical values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DescriptorValue::Categorical(_) => None,
            DescriptorValue::Integer(i) => Some(*i as f64),
            DescriptorValue::Numeric(x) => Some(*x),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DescriptorValue::Categorical(s) => Some(s),
            _ => None,
        }
    }

    fn numeric_bits(x: f64) -> u64 {
        (x + 0.0).to_bits()
    }
}

impl PartialEq for DescriptorValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DescriptorValue::Categorical(a), DescriptorValue::Categorical(b)) => a == b,
            (DescriptorValue::Integer(a), DescriptorValue::Integer(b)) => a == b,
            (DescriptorValue::Numeric(a), DescriptorValue::Numeric(b)) => {
                Self::numeric_bits(*a) == Self::numeric_bits(*b)
            }
            _ => false,
        }
    }
}

impl Eq for DescriptorValue {}

impl Hash for DescriptorValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            DescriptorValue::Categorical(s) => s.hash(state),
            DescriptorValue::Integer(i) => i.hash(state),
            DescriptorValue::Numeric(x) => Self::numeric_bits(*x).hash(state),
        }
    }
}

impl fmt::Display for DescriptorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorValue::Categorical(s) => write!(f, "{:?}", s),
            DescriptorValue::Integer(i) => write!(f, "{}", i),
            DescriptorValue::Numeric(x) => write!(f, "{}", x),
        }
    }
}

impl From<&str> for DescriptorValue {
    fn from(value: &str) -> Self {
        DescriptorValue::Categorical(value.to_string())
    }
}

impl From<String> for DescriptorValue {
    fn from(value: String) -> Self {
        DescriptorValue::Categorical(value)
    }
}

impl From<i64> for DescriptorValue {
    fn from(value: i64) -> Self {
        DescriptorValue::Integer(value)
    }
}

impl From<f64> for DescriptorValue {
    fn from(value: f64) -> Self {
        DescriptorValue::Numeric(value)
    }
}

/// One historical sale
///
/// The floor area is both the `surface` descriptor and the divisor of the
/// per-area price. Field aliases accept the historical column names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Case {
    #[serde(alias = "quartier")]
    pub location: String,
    #[serde(alias = "pieces")]
    pub rooms: i64,
    pub surface: f64,
    #[serde(alias = "terrain")]
    pub lot: f64,
    #[serde(alias = "prix")]
    pub price: f64,
}

impl Case {
    pub fn new(
        location: impl Into<String>,
        rooms: i64,
        surface: f64,
        lot: f64,
        price: f64,
    ) -> Self {
        Self {
            location: location.into(),
            rooms,
            surface,
            lot,
            price,
        }
    }

    /// Value of the case for one descriptor
    pub fn value(&self, descriptor: Descriptor) -> DescriptorValue {
        match descriptor {
            Descriptor::Location => DescriptorValue::Categorical(self.location.clone()),
            Descriptor::Rooms => DescriptorValue::Integer(self.rooms),
            Descriptor::Surface => DescriptorValue::Numeric(self.surface),
            Descriptor::Lot => DescriptorValue::Numeric(self.lot),
        }
    }

    /// Price per unit of floor area, `None` when the surface is zero.
    pub fn unit_price(&self) -> Option<f64> {
        if self.surface == 0.0 {
            None
        } else {
            Some(self.price / self.surface)
        }
    }

    /// Reject values that cannot be indexed.
    pub fn validate(&self) -> Result<()> {
        if self.location.trim().is_empty() {
            return Err(Error::InvalidCase("location must not be empty".into()));
        }
        if self.rooms < 0 {
            return Err(Error::InvalidCase(format!(
                "rooms must be non-negative, got {}",
                self.rooms
            )));
        }
        for (field, value) in [
            ("surface", self.surface),
            ("lot", self.lot),
            ("price", self.price),
        ] {
            if !value.is_finite() {
                return Err(Error::InvalidCase(format!(
                    "{} must be finite, got {}",
                    field, value
                )));
            }
        }
        Ok(())
    }
}

/// Target problem: one value per descriptor
///
/// In evaluation mode it also carries the known unit price, which is only
/// ever used to measure error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Query {
    #[serde(flatten)]
    pub values: HashMap<Descriptor, DescriptorValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_unit_price: Option<f64>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, descriptor: Descriptor, value: impl Into<DescriptorValue>) -> Self {
        self.values.insert(descriptor, value.into());
        self
    }

    /// Derive an evaluation query from a known case
    pub fn from_case(case: &Case) -> Self {
        let values = Descriptor::ORDER
            .iter()
            .map(|d| (*d, case.value(*d)))
            .collect();

        Self {
            values,
            true_unit_price: case.unit_price(),
        }
    }

    pub fn get(&self, descriptor: Descriptor) -> Option<&DescriptorValue> {
        self.values.get(&descriptor)
    }

    /// Check completeness and normalise every value to its descriptor's kind.
    ///
    /// Returns the values in `Descriptor::ORDER`.
    pub fn resolve(&self) -> Result<Vec<DescriptorValue>> {
        Descriptor::ORDER
            .iter()
            .map(|descriptor| {
                let value = self
                    .values
                    .get(descriptor)
                    .ok_or(Error::IncompleteQuery(*descriptor))?;
                descriptor.coerce(value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_query() -> Query {
        Query::new()
            .with(Descriptor::Location, "Cenon")
            .with(Descriptor::Rooms, 3i64)
            .with(Descriptor::Surface, 96.0)
            .with(Descriptor::Lot, 264.0)
    }

    #[test]
    fn test_resolve_orders_values() {
        let resolved = full_query().resolve().unwrap();
        assert_eq!(
            resolved,
            vec![
                DescriptorValue::from("Cenon"),
                DescriptorValue::Integer(3),
                DescriptorValue::Numeric(96.0),
                DescriptorValue::Numeric(264.0),
            ]
        );
    }

    #[test]
    fn test_resolve_rejects_missing_descriptor() {
        let mut query = full_query();
        query.values.remove(&Descriptor::Surface);

        match query.resolve() {
            Err(Error::IncompleteQuery(Descriptor::Surface)) => {}
            other => panic!("Unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_coerces_json_numbers() {
        let query: Query = serde_json::from_str(
            r#"{"location": "Cenon", "rooms": 3.0, "surface": 96, "lot": 264.5}"#,
        )
        .unwrap();

        let resolved = query.resolve().unwrap();
        assert_eq!(resolved[1], DescriptorValue::Integer(3));
        assert_eq!(resolved[2], DescriptorValue::Numeric(96.0));
        assert_eq!(resolved[3], DescriptorValue::Numeric(264.5));
    }

    #[test]
    fn test_resolve_rejects_wrong_kind() {
        let query = full_query().with(Descriptor::Rooms, 2.5);
        assert!(matches!(query.resolve(), Err(Error::InvalidQuery(_))));

        let query = full_query().with(Descriptor::Location, 4i64);
        assert!(matches!(query.resolve(), Err(Error::InvalidQuery(_))));
    }

    #[test]
    fn test_case_accepts_historical_columns() {
        let case: Case = serde_json::from_str(
            r#"{"quartier": "Cenon", "pieces": 4, "surface": 92, "terrain": 264, "prix": 2065}"#,
        )
        .unwrap();

        assert_eq!(case, Case::new("Cenon", 4, 92.0, 264.0, 2065.0));
        assert_eq!(case.unit_price(), Some(2065.0 / 92.0));
    }

    #[test]
    fn test_numeric_keys_fold_signed_zero() {
        use std::collections::HashSet;

        let mut keys = HashSet::new();
        keys.insert(DescriptorValue::Numeric(0.0));
        keys.insert(DescriptorValue::Numeric(-0.0));
        assert_eq!(keys.len(), 1);
    }
}
