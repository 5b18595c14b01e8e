use parking_lot::Mutex;
use std::collections::BTreeSet;

use tilt_core::{MetricDate, Symbol};
use tilt_ports::{MetricCapability, MetricProvider, MetricResult};

/// Placeholder every dry-run lookup answers with
///
/// Non-zero so formulas that divide by a metric still evaluate.
const PLACEHOLDER_VALUE: f64 = 1.0;

/// One lookup a formula asked for
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MetricRequest {
    pub symbol: Symbol,
    pub capability: MetricCapability,
    /// Single date, or `[start, end]` for window metrics
    pub dates: Vec<MetricDate>,
}

/// Data a set of evaluations will need, deduplicated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchPlan {
    /// Point prices, including both ends of every percent-change window
    pub prices: BTreeSet<(Symbol, MetricDate)>,
    /// Volatility windows
    pub stdev_windows: BTreeSet<(Symbol, MetricDate, MetricDate)>,
    /// Symbols needing a fundamentals filing
    pub fundamentals: BTreeSet<(Symbol, MetricDate)>,
}

impl FetchPlan {
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty() && self.stdev_windows.is_empty() && self.fundamentals.is_empty()
    }
}

/// Provider that records requests instead of answering them
///
/// Evaluating a formula against it reveals which prices and windows the
/// real run will touch, so a cache can be filled in one pass beforehand.
#[derive(Debug, Default)]
pub struct DryRunMetrics {
    requests: Mutex<Vec<MetricRequest>>,
}

impl DryRunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, symbol: &str, capability: MetricCapability, dates: Vec<MetricDate>) -> f64 {
        self.requests.lock().push(MetricRequest {
            symbol: symbol.to_string(),
            capability,
            dates,
        });
        PLACEHOLDER_VALUE
    }

    /// Requests in the order they were made
    pub fn requests(&self) -> Vec<MetricRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn clear(&self) {
        self.requests.lock().clear();
    }

    /// Collapse the recorded requests into what must be fetched
    pub fn plan(&self) -> FetchPlan {
        let mut plan = FetchPlan::default();
        for request in self.requests.lock().iter() {
            let symbol = request.symbol.clone();
            match (request.capability, request.dates.as_slice()) {
                (MetricCapability::Price, &[date]) => {
                    plan.prices.insert((symbol, date));
                }
                (MetricCapability::PricePercentChange, &[start, end]) => {
                    plan.prices.insert((symbol.clone(), start));
                    plan.prices.insert((symbol, end));
                }
                (MetricCapability::AnnualizedStdev, &[start, end]) => {
                    plan.stdev_windows.insert((symbol, start, end));
                }
                (
                    MetricCapability::MarketCap
                    | MetricCapability::PeRatio
                    | MetricCapability::PbRatio,
                    &[date],
                ) => {
                    plan.prices.insert((symbol.clone(), date));
                    plan.fundamentals.insert((symbol, date));
                }
                _ => {}
            }
        }
        plan
    }
}

impl MetricProvider for DryRunMetrics {
    fn price(&self, symbol: &str, date: MetricDate) -> MetricResult<f64> {
        Ok(self.record(symbol, MetricCapability::Price, vec![date]))
    }

    fn price_percent_change(
        &self,
        symbol: &str,
        start: MetricDate,
        end: MetricDate,
    ) -> MetricResult<f64> {
        Ok(self.record(symbol, MetricCapability::PricePercentChange, vec![start, end]))
    }

    fn annualized_stdev(
        &self,
        symbol: &str,
        start: MetricDate,
        end: MetricDate,
    ) -> MetricResult<f64> {
        Ok(self.record(symbol, MetricCapability::AnnualizedStdev, vec![start, end]))
    }

    fn market_cap(&self, symbol: &str, date: MetricDate) -> MetricResult<f64> {
        Ok(self.record(symbol, MetricCapability::MarketCap, vec![date]))
    }

    fn pe_ratio(&self, symbol: &str, date: MetricDate) -> MetricResult<f64> {
        Ok(self.record(symbol, MetricCapability::PeRatio, vec![date]))
    }

    fn pb_ratio(&self, symbol: &str, date: MetricDate) -> MetricResult<f64> {
        Ok(self.record(symbol, MetricCapability::PbRatio, vec![date]))
    }

    fn name(&self) -> &str {
        "DryRunMetrics"
    }
}
