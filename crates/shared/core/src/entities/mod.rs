mod policy;
mod trace;
mod weights;

pub use policy::{AssetSelectionPolicy, SelectionMode};
pub use trace::EvaluationTrace;
pub use weights::{ScoreMap, WEIGHT_SUM_TOLERANCE, WeightVector};
