use rust_decimal::Decimal;
use thiserror::Error;

use tilt_allocator::AllocationError;
use tilt_core::Symbol;
use tilt_formula::FormulaError;
use tilt_ports::MetricError;

use crate::config::ConfigError;

/// Errors surfaced by a portfolio construction run
#[derive(Error, Debug)]
pub enum Error {
    #[error("Formula error: {0}")]
    Formula(#[from] FormulaError),

    #[error("Allocation error: {0}")]
    Allocation(#[from] AllocationError),

    #[error("Metric error: {0}")]
    Metric(#[from] MetricError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cannot compute target portfolio with value {0}")]
    PortfolioValueTooSmall(Decimal),

    #[error("No price for {0}")]
    MissingPrice(Symbol),

    #[error("Price for {symbol} has no decimal form: {price}")]
    UnrepresentablePrice { symbol: Symbol, price: f64 },

    #[error("Invalid price for {symbol}: {price}")]
    InvalidPrice { symbol: Symbol, price: Decimal },

    #[error("Weight for {symbol} cannot be converted to a quantity: {weight}")]
    InvalidWeight { symbol: Symbol, weight: f64 },

    #[error("Scoring task failed: {0}")]
    Task(String),
}

impl Error {
    /// True when the run failed on a data gap rather than a bad formula or policy
    pub fn is_missing_data(&self) -> bool {
        match self {
            Error::Formula(e) => e.is_missing_data(),
            Error::Metric(e) => e.is_missing_data(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
