//! Z-score Linear Tilt
//!
//! Moves each anchor weight along its candidate's standardized score:
//!
//! ```text
//! z(s)      = (score(s) - mean) / sample_stdev
//! w'(s)     = w(s) + k * z(s)
//! k         = k_max * intensity
//! k_max     = min(1, min over s of bound(s))
//! bound(s)  = (1 - w(s)) / z(s)   if z(s) > 0
//!           = w(s) / -z(s)        if z(s) < 0
//! ```
//!
//! The z-scores sum to zero, so the tilted weights keep the anchor's sum.
//! `k_max` is the largest step that keeps every weight inside [0, 1].
//! Because only z-scores enter, the result is unchanged when raw scores are
//! rescaled by `a * score + b` with `a > 0`.

use log::{debug, warn};
use std::collections::BTreeMap;

use tilt_core::{FactorIntensity, ScoreMap, WEIGHT_SUM_TOLERANCE, WeightVector, stats};

use crate::error::{AllocationError, AllocationResult};

/// Slack for floating-point overshoot at the [0, 1] boundaries
const BOUNDARY_EPSILON: f64 = 1e-9;

/// Tilt `anchors` toward the higher-scoring candidates
///
/// `scores` must cover exactly the symbols in `anchors`.
pub fn allocate_weights(
    anchors: &WeightVector,
    scores: &ScoreMap,
    intensity: FactorIntensity,
) -> AllocationResult<WeightVector> {
    if scores.len() < 2 {
        return Err(AllocationError::InsufficientCandidates {
            found: scores.len(),
        });
    }
    if let Some(symbol) = anchors.symbols().find(|s| !scores.contains_key(*s)) {
        return Err(AllocationError::MissingScore(symbol.clone()));
    }
    if let Some(symbol) = scores.keys().find(|s| !anchors.contains(s)) {
        return Err(AllocationError::UnanchoredCandidate(symbol.clone()));
    }
    if let Some((symbol, &score)) = scores.iter().find(|(_, score)| !score.is_finite()) {
        return Err(AllocationError::InvalidScore {
            symbol: symbol.clone(),
            score,
        });
    }

    let values: Vec<f64> = scores.values().copied().collect();
    let (mean, stdev) = match (stats::mean(&values), stats::sample_stdev(&values)) {
        (Some(mean), Some(stdev)) if stdev > 0.0 && !stats::all_equal(&values) => (mean, stdev),
        _ => {
            warn!(
                "All {} candidate scores are equal, keeping anchor weights",
                values.len()
            );
            return Ok(anchors.clone());
        }
    };

    let z_scores: BTreeMap<&str, f64> = scores
        .iter()
        .map(|(symbol, &score)| (symbol.as_str(), stats::z_score(score, mean, stdev)))
        .collect();

    let mut k_max: f64 = 1.0;
    for (symbol, weight) in anchors.iter() {
        let z = z_scores.get(symbol.as_str()).copied().unwrap_or(0.0);
        let bound = if z > 0.0 {
            (1.0 - weight) / z
        } else if z < 0.0 {
            weight / -z
        } else {
            continue;
        };
        k_max = k_max.min(bound);
    }
    let k = k_max * intensity.value();
    debug!(
        "Tilt over {} candidates: mean={:.6} stdev={:.6} k_max={:.6} k={:.6}",
        scores.len(),
        mean,
        stdev,
        k_max,
        k
    );

    let mut tilted = BTreeMap::new();
    for (symbol, weight) in anchors.iter() {
        let z = z_scores.get(symbol.as_str()).copied().unwrap_or(0.0);
        let new_weight = weight + k * z;
        if !(-BOUNDARY_EPSILON..=1.0 + BOUNDARY_EPSILON).contains(&new_weight) {
            return Err(AllocationError::WeightOutOfRange {
                symbol: symbol.clone(),
                weight: new_weight,
            });
        }
        tilted.insert(symbol.clone(), new_weight.clamp(0.0, 1.0));
    }

    let sum: f64 = tilted.values().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(AllocationError::WeightIntegrity { sum });
    }

    Ok(WeightVector::new_unchecked(tilted))
}
