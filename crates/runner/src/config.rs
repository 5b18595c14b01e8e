//! Configuration loading for portfolio construction runs
//!
//! Two JSON documents drive a run:
//! - [`StrategyConfig`]: formula, universe, date and selection policy
//! - [`MarketDataFile`]: price series and fundamentals filings per symbol

use log::debug;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use thiserror::Error;

use tilt_core::{AssetSelectionPolicy, MetricDate, Symbol};
use tilt_metrics::{Fundamentals, InMemoryMetrics};

/// Smallest portfolio value a target can be computed for
pub const MIN_PORTFOLIO_VALUE: Decimal = dec!(0.001);

/// Configuration loading errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid strategy config: {0}")]
    InvalidStrategy(String),

    #[error("Invalid market data: {0}")]
    InvalidMarketData(String),
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        error: e.to_string(),
    })
}

fn default_max_concurrency() -> usize {
    8
}

/// One portfolio construction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Factor formula source
    pub formula: String,

    /// Symbols to score
    pub universe: Vec<Symbol>,

    /// Point in time the run is computed for
    pub date: MetricDate,

    /// Selection mode and tilt intensity
    pub policy: AssetSelectionPolicy,

    /// Upper bound on concurrent per-symbol evaluations
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// When set, weights are also converted into share quantities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portfolio_value: Option<Decimal>,
}

impl StrategyConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&read_file(path.as_ref())?)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check everything the type system cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.formula.trim().is_empty() {
            return Err(ConfigError::InvalidStrategy("formula is empty".to_string()));
        }
        if self.universe.is_empty() {
            return Err(ConfigError::InvalidStrategy("universe is empty".to_string()));
        }

        let mut seen = BTreeSet::new();
        for symbol in &self.universe {
            if symbol.trim().is_empty() {
                return Err(ConfigError::InvalidStrategy(
                    "universe contains an empty symbol".to_string(),
                ));
            }
            if !seen.insert(symbol.as_str()) {
                return Err(ConfigError::InvalidStrategy(format!(
                    "duplicate symbol in universe: {}",
                    symbol
                )));
            }
        }

        if self.max_concurrency == 0 {
            return Err(ConfigError::InvalidStrategy(
                "max_concurrency must be at least 1".to_string(),
            ));
        }

        self.policy
            .validate()
            .map_err(|e| ConfigError::InvalidStrategy(e.to_string()))?;

        if let Some(value) = self.portfolio_value {
            if value < MIN_PORTFOLIO_VALUE {
                return Err(ConfigError::InvalidStrategy(format!(
                    "portfolio_value must be at least {}, got {}",
                    MIN_PORTFOLIO_VALUE, value
                )));
            }
        }

        Ok(())
    }
}

/// Market data for an in-memory run
///
/// ```json
/// {
///   "prices": { "AAPL": { "2024-01-02": 185.6 } },
///   "fundamentals": { "AAPL": { "2023-11-03": { "eps_basic": 6.16 } } }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketDataFile {
    /// Adjusted daily closes per symbol
    #[serde(default)]
    pub prices: BTreeMap<Symbol, BTreeMap<MetricDate, f64>>,

    /// Fundamentals filings per symbol, keyed by the date they became known
    #[serde(default)]
    pub fundamentals: BTreeMap<Symbol, BTreeMap<MetricDate, Fundamentals>>,
}

impl MarketDataFile {
    /// Load market data from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&read_file(path.as_ref())?)
    }

    /// Parse market data from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Prices must be finite and positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (symbol, series) in &self.prices {
            for (date, price) in series {
                if !price.is_finite() || *price <= 0.0 {
                    return Err(ConfigError::InvalidMarketData(format!(
                        "{} price on {} must be positive, got {}",
                        symbol, date, price
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn symbols(&self) -> BTreeSet<&Symbol> {
        self.prices.keys().chain(self.fundamentals.keys()).collect()
    }

    /// Load everything into a point-in-time store
    pub fn into_metrics(self) -> InMemoryMetrics {
        let mut metrics = InMemoryMetrics::new();
        let price_points: usize = self.prices.values().map(BTreeMap::len).sum();
        let filings: usize = self.fundamentals.values().map(BTreeMap::len).sum();

        for (symbol, series) in self.prices {
            metrics.add_prices(symbol, series);
        }
        for (symbol, history) in self.fundamentals {
            for (known_on, filing) in history {
                metrics.add_fundamentals(symbol.clone(), known_on, filing);
            }
        }

        debug!(
            "Loaded {} price points and {} fundamentals filings",
            price_points, filings
        );
        metrics
    }
}
