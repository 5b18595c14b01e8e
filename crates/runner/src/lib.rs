//! Tilt Runner - Portfolio Construction
//!
//! Wires formula, metrics and allocator into one run:
//!
//! - **Aggregator**: scores a universe, sequentially or over a bounded worker pool
//! - **Plan**: dry-runs a formula to prefetch the data it reads
//! - **Pipeline**: score, select and tilt into a construction report
//! - **Target**: turns weights into dollar amounts and share quantities
//! - **Config**: JSON strategy and market data files
//!
//! ## Architecture
//!
//! ```text
//!   StrategyConfig            MarketDataFile
//!        │                          │
//!        ▼                          ▼
//!   ┌─────────┐  FetchPlan   ┌───────────────────┐
//!   │  Plan   │ ───────────► │  CachedMetrics    │
//!   │ dry run │              │  (InMemoryMetrics)│
//!   └─────────┘              └─────────┬─────────┘
//!                                      │ MetricProvider
//!                                      ▼
//!                      ┌───────────────────────────────┐
//!                      │  Score Aggregator             │
//!                      │  Formula per symbol           │
//!                      │  missing data => excluded     │
//!                      └───────────────┬───────────────┘
//!                                      │ ScoreSheet
//!                                      ▼
//!                      ┌───────────────────────────────┐
//!                      │  Allocator                    │
//!                      │  select + z-score tilt        │
//!                      └───────────────┬───────────────┘
//!                                      │ WeightVector
//!                                      ▼
//!                      ┌───────────────────────────────┐
//!                      │  TargetPortfolio (optional)   │
//!                      └───────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tilt_runner::construct_portfolio;
//! use tilt_formula::Formula;
//!
//! let formula = Formula::parse("pricePercentChange(nYearsAgo(1), currentDate)")?;
//! let report = construct_portfolio(&metrics, &universe, date, &formula, &policy)?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! ```

pub mod aggregator;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod plan;
pub mod target;

// Re-export main types
pub use aggregator::{
    Exclusion, ScoreSheet, score_trading_days, score_universe, score_universe_concurrent,
};
pub use config::{ConfigError, MIN_PORTFOLIO_VALUE, MarketDataFile, StrategyConfig};
pub use error::{Error, Result};
pub use pipeline::{PortfolioConstruction, construct_portfolio, construct_portfolio_concurrent};
pub use plan::{plan_data_requirements, prefetched};
pub use target::{DOLLAR_DECIMALS, TargetPortfolio, TargetPosition};
