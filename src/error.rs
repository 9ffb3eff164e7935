//! Error types for caseprice

use thiserror::Error;

use crate::types::Descriptor;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Incomplete query: missing value for {0}")]
    IncompleteQuery(Descriptor),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Empty candidate set at {0} level")]
    EmptyCandidateSet(Descriptor),

    #[error("Degenerate aggregate: total area is zero for path [{path}]")]
    DegenerateAggregate { path: String },

    #[error("No {descriptor} weight for retrieved value {value}")]
    WeightLookup { descriptor: Descriptor, value: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid case: {0}")]
    InvalidCase(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn index(msg: impl Into<String>) -> Self {
        Error::Index(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }
}
