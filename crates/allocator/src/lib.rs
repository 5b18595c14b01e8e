//! Tilt Allocator
//!
//! Turns factor scores into a valid portfolio allocation.
//!
//! ## Architecture
//!
//! ```text
//! ScoreMap ──► ┌──────────────────────────────────────────┐
//!              │  Asset Selector                          │
//!              │  - FIXED_COUNT: top N, equal anchors     │
//!              │  - ANCHOR_PORTFOLIO: given anchors       │
//!              │  - TOP_QUANTILE: rejected (unresolved)   │
//!              └──────────────────┬───────────────────────┘
//!                                 │ candidates + anchors
//!              ┌──────────────────▼───────────────────────┐
//!              │  Weight Allocator (z-score linear tilt)  │
//!              │  - step bounded to keep weights in [0,1] │
//!              │  - scaled by factor intensity            │
//!              └──────────────────┬───────────────────────┘
//!                                 │
//!                                 ▼
//!                     WeightVector (sums to 1)
//! ```
//!
//! Everything here is a pure function of its inputs.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tilt_allocator::allocate;
//! use tilt_core::{AssetSelectionPolicy, FactorIntensity};
//!
//! let policy = AssetSelectionPolicy::fixed_count(10, FactorIntensity::FULL)?;
//! let allocation = allocate(&scores, &policy)?;
//! for (symbol, weight) in allocation.weights.iter() {
//!     println!("{symbol}: {weight:.4}");
//! }
//! ```

pub mod allocation;
pub mod error;
pub mod selector;
pub mod tilt;

pub use allocation::{Allocation, allocate};
pub use error::{AllocationError, AllocationResult};
pub use selector::{Selection, select_assets};
pub use tilt::allocate_weights;
