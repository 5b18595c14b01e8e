//! Tilt Core Domain
//!
//! Pure domain types for the factor-tilt portfolio engine.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod error;
pub mod stats;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    AssetSelectionPolicy, EvaluationTrace, ScoreMap, SelectionMode, WEIGHT_SUM_TOLERANCE,
    WeightVector,
};
pub use error::{DomainError, DomainResult};
pub use values::{
    FactorIntensity, MetricDate, Symbol, add_calendar, format_iso_date, parse_iso_date,
};
