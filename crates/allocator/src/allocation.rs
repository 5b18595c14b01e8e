//! Allocation
//!
//! Selection followed by the tilt, as one call per policy.

use log::info;
use serde::{Deserialize, Serialize};

use tilt_core::{AssetSelectionPolicy, ScoreMap, SelectionMode, WeightVector};

use crate::error::AllocationResult;
use crate::selector::{Selection, select_assets};
use crate::tilt::allocate_weights;

/// Selected candidates and their final weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub selection: Selection,
    pub weights: WeightVector,
}

/// Select with `policy`, then tilt the anchors by the selected scores
///
/// A fixed-count selection that finds a single scored asset holds it at
/// weight 1; every other path goes through the tilt.
pub fn allocate(scores: &ScoreMap, policy: &AssetSelectionPolicy) -> AllocationResult<Allocation> {
    let selection = select_assets(scores, policy)?;

    let weights = match policy.mode {
        SelectionMode::FixedCount { .. } if selection.len() == 1 => selection.anchors.clone(),
        _ => allocate_weights(&selection.anchors, &selection.candidates, policy.intensity)?,
    };

    info!(
        "{} allocation over {} assets (intensity {})",
        policy.mode,
        weights.len(),
        policy.intensity.value()
    );
    Ok(Allocation { selection, weights })
}
