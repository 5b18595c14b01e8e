//! Tilt Metric Providers
//!
//! Implementations of the [`MetricProvider`] port:
//!
//! - [`InMemoryMetrics`]: point-in-time store of prices and fundamentals filings
//! - [`DryRunMetrics`]: records which data a formula asks for, returns placeholders
//! - [`CachedMetrics`]: memoizes every lookup of another provider
//!
//! ## Usage
//!
//! ```ignore
//! use tilt_metrics::{CachedMetrics, DryRunMetrics, InMemoryMetrics};
//!
//! // Find out what a formula needs, then warm a cache in front of the real source
//! let dry_run = DryRunMetrics::new();
//! // ... evaluate the formula against `dry_run` for every symbol ...
//! let cache = CachedMetrics::new(source);
//! cache.prefetch(&dry_run.plan())?;
//! ```

mod cached;
mod dry_run;
mod in_memory;

pub use cached::CachedMetrics;
pub use dry_run::{DryRunMetrics, FetchPlan, MetricRequest};
pub use in_memory::{Fundamentals, InMemoryMetrics, PRICE_LOOKBACK_DAYS};

// Re-export the port for convenience
pub use tilt_ports::{MetricError, MetricProvider, MetricResult, MissingDataError};
