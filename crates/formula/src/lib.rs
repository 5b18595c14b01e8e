//! Tilt Formula
//!
//! A small expression language for per-asset factor scores. A formula is one
//! string over a closed set of metric functions, arithmetic and comparison
//! operators, and the bound variable `currentDate`:
//!
//! ```text
//! pricePercentChange(nYearsAgo(1), currentDate) / stdev(nYearsAgo(1), currentDate)
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! source ──► Lexer ──► Parser ──► Expr ──► EvaluationContext ──► Evaluation
//!                        │                   │  provider handle      score
//!                        │                   │  symbol, date         trace
//!                        ▼                   ▼
//!                  Syntax errors       Type / MissingData / Provider errors
//! ```
//!
//! Metric functions (`price`, `pricePercentChange`, `stdev`, `marketCap`,
//! `peRatio`, `pbRatio`) delegate to a [`MetricProvider`](tilt_ports::MetricProvider)
//! and record the returned value in the [`EvaluationTrace`](tilt_core::EvaluationTrace).
//! Date helpers (`addDate`, `nDaysAgo`, `nMonthsAgo`, `nYearsAgo`) are pure.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tilt_formula::Formula;
//!
//! let formula = Formula::parse("price(currentDate) / peRatio(currentDate)")?;
//! let evaluation = formula.evaluate(&metrics, "AAPL", date)?;
//! println!("{} {:?}", evaluation.score, evaluation.trace);
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod fingerprint;
pub mod formula;
pub mod functions;
pub mod lexer;
pub mod parser;

pub use error::{FormulaError, FormulaResult};
pub use evaluator::{Evaluation, EvaluationContext, Value};
pub use fingerprint::fingerprint;
pub use formula::{Formula, evaluate};
pub use functions::FormulaFunction;
