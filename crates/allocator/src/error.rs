//! Allocation errors
//!
//! Every variant is a validation failure for the call; none are retried.

use thiserror::Error;
use tilt_core::{DomainError, Symbol};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocationError {
    #[error("At least 2 scored candidates are required, found {found}")]
    InsufficientCandidates { found: usize },

    #[error("No factor score for anchor asset {0}")]
    MissingScore(Symbol),

    #[error("Scored candidate {0} is not in the anchor portfolio")]
    UnanchoredCandidate(Symbol),

    #[error("Factor score for {symbol} is not finite: {score}")]
    InvalidScore { symbol: Symbol, score: f64 },

    #[error("Tilted weights sum to {sum}, expected 1")]
    WeightIntegrity { sum: f64 },

    #[error("Tilted weight for {symbol} out of range [0, 1]: {weight}")]
    WeightOutOfRange { symbol: Symbol, weight: f64 },

    #[error("Invalid selection policy: {0}")]
    InvalidPolicy(#[from] DomainError),

    #[error("Selection policy {0} is not supported")]
    UnresolvedPolicy(String),
}

pub type AllocationResult<T> = std::result::Result<T, AllocationError>;
