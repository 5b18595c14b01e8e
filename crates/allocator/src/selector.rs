//! Asset Selection
//!
//! Narrows the scored universe to the candidates a policy holds, and gives
//! each candidate its anchor weight before any tilt.

use log::debug;
use serde::{Deserialize, Serialize};

use tilt_core::{AssetSelectionPolicy, ScoreMap, SelectionMode, Symbol, WeightVector};

use crate::error::{AllocationError, AllocationResult};

/// Candidates picked by a policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Scores of the selected symbols only
    pub candidates: ScoreMap,
    /// Baseline weight per candidate
    pub anchors: WeightVector,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Apply a selection policy to the scored universe
pub fn select_assets(
    scores: &ScoreMap,
    policy: &AssetSelectionPolicy,
) -> AllocationResult<Selection> {
    policy.validate()?;

    let selection = match &policy.mode {
        SelectionMode::FixedCount { count } => top_n(scores, *count)?,
        SelectionMode::AnchorPortfolio { weights } => anchored(scores, weights)?,
        SelectionMode::TopQuantile => {
            return Err(AllocationError::UnresolvedPolicy(
                policy.mode.name().to_string(),
            ));
        }
    };

    debug!(
        "{} selected {} of {} scored assets",
        policy.mode,
        selection.len(),
        scores.len()
    );
    Ok(selection)
}

/// Highest `count` scores, ties broken by symbol; fewer if fewer are scored
fn top_n(scores: &ScoreMap, count: usize) -> AllocationResult<Selection> {
    if scores.is_empty() {
        return Err(AllocationError::InsufficientCandidates { found: 0 });
    }

    let mut ranked: Vec<(&Symbol, f64)> = scores.iter().map(|(s, v)| (s, *v)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(count);

    let candidates: ScoreMap = ranked.iter().map(|(s, v)| ((*s).clone(), *v)).collect();
    let anchors = WeightVector::equal(candidates.keys().cloned());
    Ok(Selection {
        candidates,
        anchors,
    })
}

/// Exactly the anchor's symbols, each of which must be scored
fn anchored(scores: &ScoreMap, weights: &WeightVector) -> AllocationResult<Selection> {
    let mut candidates = ScoreMap::new();
    for symbol in weights.symbols() {
        let score = scores
            .get(symbol)
            .ok_or_else(|| AllocationError::MissingScore(symbol.clone()))?;
        candidates.insert(symbol.clone(), *score);
    }
    Ok(Selection {
        candidates,
        anchors: weights.clone(),
    })
}
