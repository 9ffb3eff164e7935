//! Estimation session: one index over one case base snapshot

use serde::Serialize;

use crate::adaptation::{adapt, Delta};
use crate::casebase::CaseBase;
use crate::index::CaseIndex;
use crate::profile::Profile;
use crate::retrieval::{Retriever, RetrievedCase};
use crate::types::Query;
use crate::Result;

/// Estimated unit price with its diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    pub price: i64,
    pub retrieved: RetrievedCase,
    pub deltas: Vec<Delta>,
}

pub struct Estimator {
    index: CaseIndex,
    profile: Profile,
}

impl Estimator {
    /// Index the case base for a new session
    pub fn build(base: &CaseBase, profile: Profile) -> Result<Self> {
        let index = CaseIndex::build(base)?;
        Ok(Self { index, profile })
    }

    pub fn index(&self) -> &CaseIndex {
        &self.index
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Retrieve the nearest case and adapt its price to the query
    pub fn estimate(&self, query: &Query) -> Result<Estimate> {
        let retrieved = Retriever::new(&self.index, &self.profile).retrieve(query)?;
        let adaptation = adapt(query, &retrieved, &self.profile)?;

        tracing::debug!(
            price = adaptation.estimate,
            retrieved_price = retrieved.unit_price,
            "Estimated unit price"
        );

        Ok(Estimate {
            price: adaptation.estimate,
            retrieved,
            deltas: adaptation.deltas,
        })
    }
}
