//! Caseprice - case-based reasoning estimator for real-estate unit prices
//!
//! A base of historical sales is indexed into a tree with one level per
//! descriptor (location, rooms, surface, lot). Estimation walks that tree
//! towards the most similar cases, keeps the cheapest reachable leaf and
//! corrects its price with a linear per-descriptor adaptation:
//! - `index` builds the tree and its area-weighted leaf prices
//! - `retrieval` performs the similarity-guided minimum-price search
//! - `adaptation` applies the weighted correction
//! - `evaluation` and `tuning` calibrate weights with leave-one-out error

pub mod adaptation;
pub mod casebase;
pub mod config;
pub mod error;
pub mod estimator;
pub mod evaluation;
pub mod index;
pub mod profile;
pub mod retrieval;
pub mod similarity;
pub mod tuning;
pub mod types;

pub use error::{Error, Result};
pub use estimator::{Estimate, Estimator};
