//! Target Portfolio
//!
//! Converts final weights into the dollar amounts and share quantities a
//! portfolio of a given value should hold. The target never holds cash.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use tilt_core::{Symbol, WeightVector};

use crate::config::MIN_PORTFOLIO_VALUE;
use crate::error::{Error, Result};

/// Decimal places dollar amounts are rounded to
pub const DOLLAR_DECIMALS: u32 = 3;

/// What one symbol should be held at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPosition {
    pub symbol: Symbol,
    pub weight: f64,
    pub price: Decimal,
    pub dollars: Decimal,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPortfolio {
    pub portfolio_value: Decimal,
    pub positions: BTreeMap<Symbol, TargetPosition>,
}

impl TargetPortfolio {
    /// Size each weight against `portfolio_value` at the given prices
    ///
    /// `dollars = round(value * weight, 3)` rounding half away from zero, and
    /// `quantity = dollars / price`.
    pub fn from_weights(
        weights: &WeightVector,
        prices: &BTreeMap<Symbol, Decimal>,
        portfolio_value: Decimal,
    ) -> Result<Self> {
        if portfolio_value < MIN_PORTFOLIO_VALUE {
            return Err(Error::PortfolioValueTooSmall(portfolio_value));
        }

        let mut positions = BTreeMap::new();
        for (symbol, weight) in weights.iter() {
            let price = *prices
                .get(symbol)
                .ok_or_else(|| Error::MissingPrice(symbol.clone()))?;
            if price <= Decimal::ZERO {
                return Err(Error::InvalidPrice {
                    symbol: symbol.clone(),
                    price,
                });
            }

            let invalid_weight = || Error::InvalidWeight {
                symbol: symbol.clone(),
                weight,
            };
            let dollars = Decimal::from_f64(weight)
                .and_then(|w| portfolio_value.checked_mul(w))
                .ok_or_else(invalid_weight)?
                .round_dp_with_strategy(DOLLAR_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
            let quantity = dollars.checked_div(price).ok_or_else(invalid_weight)?;

            positions.insert(
                symbol.clone(),
                TargetPosition {
                    symbol: symbol.clone(),
                    weight,
                    price,
                    dollars,
                    quantity,
                },
            );
        }

        Ok(Self {
            portfolio_value,
            positions,
        })
    }

    pub fn get(&self, symbol: &str) -> Option<&TargetPosition> {
        self.positions.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Dollars allocated across all positions
    pub fn invested(&self) -> Decimal {
        self.positions.values().map(|p| p.dollars).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn prices(pairs: &[(&str, Decimal)]) -> BTreeMap<Symbol, Decimal> {
        pairs.iter().map(|(s, p)| (s.to_string(), *p)).collect()
    }

    #[test]
    fn test_quantities_from_weights() {
        let weights = WeightVector::from_pairs([("A", 0.25), ("B", 0.75)]).unwrap();
        let target = TargetPortfolio::from_weights(
            &weights,
            &prices(&[("A", dec!(10)), ("B", dec!(30))]),
            dec!(1000),
        )
        .unwrap();

        assert_eq!(target.len(), 2);
        assert_eq!(target.get("A").unwrap().dollars, dec!(250));
        assert_eq!(target.get("A").unwrap().quantity, dec!(25));
        assert_eq!(target.get("B").unwrap().quantity, dec!(25));
        assert_eq!(target.invested(), dec!(1000));
    }

    #[test]
    fn test_dollars_round_to_three_places() {
        let weights = WeightVector::equal(["A", "B", "C"]);
        let target = TargetPortfolio::from_weights(
            &weights,
            &prices(&[("A", dec!(1)), ("B", dec!(2)), ("C", dec!(4))]),
            dec!(100),
        )
        .unwrap();

        assert_eq!(target.get("A").unwrap().dollars, dec!(33.333));
        assert_eq!(target.get("C").unwrap().quantity, dec!(8.33325));
    }

    #[test]
    fn test_portfolio_value_too_small() {
        let weights = WeightVector::equal(["A"]);
        let err = TargetPortfolio::from_weights(&weights, &prices(&[("A", dec!(1))]), dec!(0.0009))
            .unwrap_err();
        assert!(matches!(err, Error::PortfolioValueTooSmall(_)));
    }

    #[test]
    fn test_missing_price() {
        let weights = WeightVector::equal(["A", "B"]);
        let err = TargetPortfolio::from_weights(&weights, &prices(&[("A", dec!(5))]), dec!(100))
            .unwrap_err();
        assert!(matches!(err, Error::MissingPrice(symbol) if symbol == "B"));
    }

    #[test]
    fn test_non_positive_price() {
        let weights = WeightVector::equal(["A"]);
        let err = TargetPortfolio::from_weights(&weights, &prices(&[("A", dec!(0))]), dec!(100))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPrice { .. }));
    }
}
