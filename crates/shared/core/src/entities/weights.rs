use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{DomainError, DomainResult};
use crate::values::Symbol;

/// Tolerance on the sum of a weight vector
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-4;

/// Factor scores keyed by symbol
///
/// Ordered so that iteration never depends on hashing.
pub type ScoreMap = BTreeMap<Symbol, f64>;

/// Portfolio allocation: symbol -> weight
///
/// A validated vector sums to 1 (within [`WEIGHT_SUM_TOLERANCE`]) and every
/// weight lies in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightVector {
    weights: BTreeMap<Symbol, f64>,
}

impl WeightVector {
    /// Wrap weights without checking the invariants
    pub fn new_unchecked(weights: BTreeMap<Symbol, f64>) -> Self {
        Self { weights }
    }

    /// Build a weight vector and check sum and bounds
    pub fn new(weights: BTreeMap<Symbol, f64>) -> DomainResult<Self> {
        let vector = Self { weights };
        vector.validate()?;
        Ok(vector)
    }

    /// Build from (symbol, weight) pairs, checking the invariants
    pub fn from_pairs<S, I>(pairs: I) -> DomainResult<Self>
    where
        S: Into<Symbol>,
        I: IntoIterator<Item = (S, f64)>,
    {
        Self::new(pairs.into_iter().map(|(s, w)| (s.into(), w)).collect())
    }

    /// Equal weight across the given symbols
    pub fn equal<S, I>(symbols: I) -> Self
    where
        S: Into<Symbol>,
        I: IntoIterator<Item = S>,
    {
        let symbols: Vec<Symbol> = symbols.into_iter().map(Into::into).collect();
        let weight = 1.0 / symbols.len() as f64;
        Self {
            weights: symbols.into_iter().map(|s| (s, weight)).collect(),
        }
    }

    /// Check that weights sum to 1 and each lies in [0, 1]
    pub fn validate(&self) -> DomainResult<()> {
        for (symbol, &weight) in &self.weights {
            if !(0.0..=1.0).contains(&weight) {
                return Err(DomainError::WeightOutOfRange {
                    symbol: symbol.clone(),
                    weight,
                });
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(DomainError::WeightSum(sum));
        }
        Ok(())
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.weights.get(symbol).copied()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.weights.contains_key(symbol)
    }

    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.weights.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, f64)> {
        self.weights.iter().map(|(s, w)| (s, *w))
    }

    pub fn as_map(&self) -> &BTreeMap<Symbol, f64> {
        &self.weights
    }

    pub fn into_inner(self) -> BTreeMap<Symbol, f64> {
        self.weights
    }
}
