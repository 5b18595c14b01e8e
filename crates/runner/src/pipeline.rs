//! Portfolio construction pipeline
//!
//! score -> select -> tilt, for one date, producing a report that carries
//! the weights together with the evidence behind them.

use log::info;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use tilt_allocator::{AllocationError, allocate};
use tilt_core::{
    AssetSelectionPolicy, EvaluationTrace, MetricDate, ScoreMap, Symbol, WeightVector,
};
use tilt_formula::Formula;
use tilt_ports::MetricProvider;

use crate::aggregator::{Exclusion, ScoreSheet, score_universe, score_universe_concurrent};
use crate::error::{Error, Result};
use crate::target::TargetPortfolio;

/// Outcome of one construction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioConstruction {
    pub run_id: Uuid,
    pub date: MetricDate,
    pub formula: String,
    /// Whitespace-insensitive hash of the formula source
    pub fingerprint: String,
    pub policy: AssetSelectionPolicy,
    pub weights: WeightVector,
    /// Scores of the held symbols
    pub scores: ScoreMap,
    /// Metric values behind each held symbol's score
    pub traces: BTreeMap<Symbol, EvaluationTrace>,
    /// Symbols dropped for missing data
    pub excluded: Vec<Exclusion>,
    /// Number of symbols that produced a score
    pub scored: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetPortfolio>,
}

impl PortfolioConstruction {
    /// Select and tilt over an already computed score sheet
    pub fn from_sheet(
        formula: &Formula,
        policy: &AssetSelectionPolicy,
        sheet: ScoreSheet,
    ) -> Result<Self> {
        let allocation = allocate(&sheet.scores, policy)?;
        let ScoreSheet {
            date,
            scores,
            mut traces,
            excluded,
        } = sheet;

        let held = allocation.selection.candidates;
        traces.retain(|symbol, _| held.contains_key(symbol));

        let construction = Self {
            run_id: Uuid::new_v4(),
            date,
            formula: formula.source().to_string(),
            fingerprint: formula.fingerprint(),
            policy: policy.clone(),
            weights: allocation.weights,
            scores: held,
            traces,
            excluded,
            scored: scores.len(),
            target: None,
        };
        info!(
            "Run {} on {}: holding {} of {} scored symbols ({} excluded)",
            construction.run_id,
            construction.date,
            construction.weights.len(),
            construction.scored,
            construction.excluded.len()
        );
        Ok(construction)
    }

    /// Size the weights against `portfolio_value` using prices on the run date
    pub fn target_portfolio(
        &self,
        provider: &dyn MetricProvider,
        portfolio_value: Decimal,
    ) -> Result<TargetPortfolio> {
        let mut prices = BTreeMap::new();
        for symbol in self.weights.symbols() {
            let price = provider.price(symbol, self.date)?;
            let price = Decimal::from_f64(price).ok_or_else(|| Error::UnrepresentablePrice {
                symbol: symbol.clone(),
                price,
            })?;
            prices.insert(symbol.clone(), price);
        }
        TargetPortfolio::from_weights(&self.weights, &prices, portfolio_value)
    }

    /// Attach a target portfolio to the report
    pub fn with_target(
        mut self,
        provider: &dyn MetricProvider,
        portfolio_value: Decimal,
    ) -> Result<Self> {
        self.target = Some(self.target_portfolio(provider, portfolio_value)?);
        Ok(self)
    }
}

/// Score `universe` on `date`, then select and tilt with `policy`
pub fn construct_portfolio(
    provider: &dyn MetricProvider,
    universe: &[Symbol],
    date: MetricDate,
    formula: &Formula,
    policy: &AssetSelectionPolicy,
) -> Result<PortfolioConstruction> {
    policy.validate().map_err(AllocationError::from)?;
    let sheet = score_universe(provider, formula, universe, date)?;
    PortfolioConstruction::from_sheet(formula, policy, sheet)
}

/// [`construct_portfolio`] with scoring spread over `max_concurrency` workers
pub async fn construct_portfolio_concurrent(
    provider: Arc<dyn MetricProvider>,
    universe: &[Symbol],
    date: MetricDate,
    formula: Arc<Formula>,
    policy: &AssetSelectionPolicy,
    max_concurrency: usize,
) -> Result<PortfolioConstruction> {
    policy.validate().map_err(AllocationError::from)?;
    let sheet =
        score_universe_concurrent(provider, formula.clone(), universe, date, max_concurrency)
            .await?;
    PortfolioConstruction::from_sheet(&formula, policy, sheet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tilt_core::{FactorIntensity, WEIGHT_SUM_TOLERANCE};
    use tilt_metrics::InMemoryMetrics;

    fn date(y: i32, m: u32, d: u32) -> MetricDate {
        MetricDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn market() -> InMemoryMetrics {
        let day = date(2024, 1, 2);
        InMemoryMetrics::new()
            .with_price("A", day, 10.0)
            .with_price("B", day, 20.0)
            .with_price("C", day, 30.0)
            .with_price("D", day, 40.0)
    }

    fn universe() -> Vec<Symbol> {
        ["A", "B", "C", "D", "E"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fixed_count_construction() {
        let formula = Formula::parse("price(currentDate)").unwrap();
        let policy = AssetSelectionPolicy::fixed_count(3, FactorIntensity::FULL).unwrap();

        let report =
            construct_portfolio(&market(), &universe(), date(2024, 1, 2), &formula, &policy)
                .unwrap();

        let held: Vec<&str> = report.weights.symbols().map(String::as_str).collect();
        assert_eq!(held, vec!["B", "C", "D"]);
        assert_eq!(report.scored, 4);
        assert_eq!(report.excluded.len(), 1);
        assert_eq!(report.excluded[0].symbol, "E");
        assert_eq!(report.traces.len(), 3);
        assert!((report.weights.sum() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE);
        assert_eq!(report.fingerprint, formula.fingerprint());
    }

    #[test]
    fn test_anchor_with_excluded_symbol_fails() {
        let formula = Formula::parse("price(currentDate)").unwrap();
        let policy = AssetSelectionPolicy::anchor_portfolio(
            [("A", 0.5), ("E", 0.5)],
            FactorIntensity::FULL,
        )
        .unwrap();

        let err = construct_portfolio(&market(), &universe(), date(2024, 1, 2), &formula, &policy)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Allocation(AllocationError::MissingScore(symbol)) if symbol == "E"
        ));
    }

    #[test]
    fn test_target_portfolio_from_report() {
        let formula = Formula::parse("price(currentDate)").unwrap();
        let policy = AssetSelectionPolicy::anchor_portfolio(
            [("A", 0.5), ("B", 0.5)],
            FactorIntensity::new(0.5).unwrap(),
        )
        .unwrap();
        let metrics = market();

        let report =
            construct_portfolio(&metrics, &universe(), date(2024, 1, 2), &formula, &policy)
                .unwrap()
                .with_target(&metrics, dec!(1000))
                .unwrap();

        let target = report.target.unwrap();
        assert_eq!(target.get("A").unwrap().dollars, dec!(250));
        assert_eq!(target.get("B").unwrap().quantity, dec!(37.5));
    }

    #[test]
    fn test_non_finite_price_cannot_be_sized() {
        let formula = Formula::parse("price(currentDate)").unwrap();
        let policy = AssetSelectionPolicy::fixed_count(2, FactorIntensity::FULL).unwrap();
        let day = date(2024, 1, 2);
        let report = construct_portfolio(&market(), &universe(), day, &formula, &policy).unwrap();

        let broken = InMemoryMetrics::new()
            .with_price("C", day, f64::NAN)
            .with_price("D", day, 40.0);
        let err = report.target_portfolio(&broken, dec!(1000)).unwrap_err();
        assert!(matches!(
            err,
            Error::UnrepresentablePrice { ref symbol, price } if symbol == "C" && price.is_nan()
        ));
    }

    #[tokio::test]
    async fn test_concurrent_construction_matches() {
        let formula = Formula::parse("price(currentDate) * 2").unwrap();
        let policy = AssetSelectionPolicy::fixed_count(2, FactorIntensity::FULL).unwrap();
        let day = date(2024, 1, 2);

        let sequential =
            construct_portfolio(&market(), &universe(), day, &formula, &policy).unwrap();
        let concurrent = construct_portfolio_concurrent(
            Arc::new(market()),
            &universe(),
            day,
            Arc::new(formula),
            &policy,
            3,
        )
        .await
        .unwrap();

        assert_eq!(concurrent.weights, sequential.weights);
        assert_eq!(concurrent.excluded, sequential.excluded);
        assert_ne!(concurrent.run_id, sequential.run_id);
    }
}
