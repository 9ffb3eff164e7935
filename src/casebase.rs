//! In-memory case base
//!
//! The case base is an immutable snapshot: removing a case produces a new
//! base, and every index is built fresh from one.

use std::io::Read;
use std::path::Path;

use crate::types::Case;
use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct CaseBase {
    cases: Vec<Case>,
}

impl CaseBase {
    /// Create a case base, rejecting cases that cannot be indexed
    pub fn new(cases: Vec<Case>) -> Result<Self> {
        for (position, case) in cases.iter().enumerate() {
            case.validate().map_err(|e| match e {
                Error::InvalidCase(msg) => {
                    Error::InvalidCase(format!("case #{}: {}", position, msg))
                }
                other => other,
            })?;
        }
        Ok(Self { cases })
    }

    /// Load a JSON array of cases
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let cases: Vec<Case> = serde_json::from_reader(reader)?;
        Self::new(cases)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let base = Self::from_reader(std::io::BufReader::new(file))?;
        tracing::info!(path = %path.display(), cases = base.len(), "Loaded case base");
        Ok(base)
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    pub fn get(&self, position: usize) -> Option<&Case> {
        self.cases.get(position)
    }

    /// Copy of the base with one case left out
    pub fn without(&self, position: usize) -> Result<Self> {
        if position >= self.cases.len() {
            return Err(Error::internal(format!(
                "case position {} out of range ({} cases)",
                position,
                self.cases.len()
            )));
        }

        let cases = self
            .cases
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != position)
            .map(|(_, case)| case.clone())
            .collect();
        Ok(Self { cases })
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}
