use thiserror::Error;

/// Validation errors for domain values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Factor intensity must be in (0, 1], got {0}")]
    InvalidIntensity(f64),

    #[error("Fixed count must be at least 1")]
    ZeroFixedCount,

    #[error("Anchor portfolio needs at least 2 assets, got {0}")]
    AnchorTooSmall(usize),

    #[error("Weights must sum to 1, got {0}")]
    WeightSum(f64),

    #[error("Weight for {symbol} out of range [0, 1]: {weight}")]
    WeightOutOfRange { symbol: String, weight: f64 },
}

pub type DomainResult<T> = std::result::Result<T, DomainError>;
