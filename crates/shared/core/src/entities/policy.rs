use serde::{Deserialize, Serialize};
use std::fmt;

use super::weights::WeightVector;
use crate::error::{DomainError, DomainResult};
use crate::values::{FactorIntensity, Symbol};

/// How candidate assets are picked from the scored universe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionMode {
    /// Always hold the N highest-scoring assets
    #[serde(alias = "NUM_SYMBOLS")]
    FixedCount { count: usize },
    /// Tilt a given baseline portfolio; every asset in it stays held
    AnchorPortfolio { weights: WeightVector },
    /// Keep the top quantile of the score distribution (cutoff rule unresolved)
    #[serde(alias = "TOP_QUARTILE")]
    TopQuantile,
}

impl SelectionMode {
    pub fn name(&self) -> &'static str {
        match self {
            SelectionMode::FixedCount { .. } => "FIXED_COUNT",
            SelectionMode::AnchorPortfolio { .. } => "ANCHOR_PORTFOLIO",
            SelectionMode::TopQuantile => "TOP_QUANTILE",
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Selection mode plus the tilt intensity applied to the selected assets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSelectionPolicy {
    #[serde(flatten)]
    pub mode: SelectionMode,
    #[serde(default)]
    pub intensity: FactorIntensity,
}

impl AssetSelectionPolicy {
    pub fn fixed_count(count: usize, intensity: FactorIntensity) -> DomainResult<Self> {
        let policy = Self {
            mode: SelectionMode::FixedCount { count },
            intensity,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn anchor_portfolio<S, I>(weights: I, intensity: FactorIntensity) -> DomainResult<Self>
    where
        S: Into<Symbol>,
        I: IntoIterator<Item = (S, f64)>,
    {
        let policy = Self {
            mode: SelectionMode::AnchorPortfolio {
                weights: WeightVector::new_unchecked(
                    weights.into_iter().map(|(s, w)| (s.into(), w)).collect(),
                ),
            },
            intensity,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn top_quantile(intensity: FactorIntensity) -> Self {
        Self {
            mode: SelectionMode::TopQuantile,
            intensity,
        }
    }

    /// Check mode parameters
    ///
    /// Deserialized policies skip the constructors, so callers validate
    /// before use.
    pub fn validate(&self) -> DomainResult<()> {
        match &self.mode {
            SelectionMode::FixedCount { count } => {
                if *count == 0 {
                    return Err(DomainError::ZeroFixedCount);
                }
            }
            SelectionMode::AnchorPortfolio { weights } => {
                if weights.len() < 2 {
                    return Err(DomainError::AnchorTooSmall(weights.len()));
                }
                weights.validate()?;
            }
            SelectionMode::TopQuantile => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_count_rejects_zero() {
        assert_eq!(
            AssetSelectionPolicy::fixed_count(0, FactorIntensity::FULL),
            Err(DomainError::ZeroFixedCount)
        );
        assert!(AssetSelectionPolicy::fixed_count(3, FactorIntensity::FULL).is_ok());
    }

    #[test]
    fn test_anchor_needs_two_assets() {
        let err = AssetSelectionPolicy::anchor_portfolio([("A", 1.0)], FactorIntensity::FULL)
            .unwrap_err();
        assert_eq!(err, DomainError::AnchorTooSmall(1));
    }

    #[test]
    fn test_anchor_must_sum_to_one() {
        let err = AssetSelectionPolicy::anchor_portfolio(
            [("A", 0.5), ("B", 0.4)],
            FactorIntensity::FULL,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::WeightSum(_)));
    }

    #[test]
    fn test_deserialize_fixed_count() {
        let policy: AssetSelectionPolicy =
            serde_json::from_str(r#"{"mode":"FIXED_COUNT","count":3,"intensity":0.5}"#).unwrap();
        assert_eq!(policy.mode, SelectionMode::FixedCount { count: 3 });
        assert_eq!(policy.intensity.value(), 0.5);
    }

    #[test]
    fn test_deserialize_legacy_mode_names() {
        let policy: AssetSelectionPolicy =
            serde_json::from_str(r#"{"mode":"NUM_SYMBOLS","count":10}"#).unwrap();
        assert_eq!(policy.mode, SelectionMode::FixedCount { count: 10 });
        assert_eq!(policy.intensity, FactorIntensity::FULL);

        let policy: AssetSelectionPolicy =
            serde_json::from_str(r#"{"mode":"TOP_QUARTILE"}"#).unwrap();
        assert_eq!(policy.mode, SelectionMode::TopQuantile);
    }

    #[test]
    fn test_deserialize_anchor_then_validate() {
        let policy: AssetSelectionPolicy = serde_json::from_str(
            r#"{"mode":"ANCHOR_PORTFOLIO","weights":{"A":0.7,"B":0.7},"intensity":1.0}"#,
        )
        .unwrap();
        assert!(policy.validate().is_err());
    }
}
