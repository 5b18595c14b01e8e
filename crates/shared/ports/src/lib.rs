//! Tilt Ports
//!
//! Port definitions (traits) for the factor-tilt portfolio engine.
//! These define the boundaries between scoring logic and data sources.

mod error;
mod metrics;

pub use error::{MetricError, MetricResult, MissingDataError};
pub use metrics::{MetricCapability, MetricProvider};
