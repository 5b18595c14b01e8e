use std::fmt;
use std::sync::Arc;

use tilt_core::MetricDate;

use crate::error::MetricResult;

/// Data-access capabilities a provider exposes to formulas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricCapability {
    Price,
    PricePercentChange,
    AnnualizedStdev,
    MarketCap,
    PeRatio,
    PbRatio,
}

impl MetricCapability {
    /// Name as it appears in formulas and traces
    pub fn name(&self) -> &'static str {
        match self {
            MetricCapability::Price => "price",
            MetricCapability::PricePercentChange => "pricePercentChange",
            MetricCapability::AnnualizedStdev => "stdev",
            MetricCapability::MarketCap => "marketCap",
            MetricCapability::PeRatio => "peRatio",
            MetricCapability::PbRatio => "pbRatio",
        }
    }
}

impl fmt::Display for MetricCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Port for point-in-time financial metrics
///
/// Implementations answer as of the given date only (no look-ahead).
/// A metric that is not known yet is reported as
/// [`MetricError::MissingData`](crate::MetricError::MissingData); anything
/// else is a provider failure. Retries and timeouts are the implementation's
/// concern.
pub trait MetricProvider: Send + Sync {
    /// Adjusted close price
    fn price(&self, symbol: &str, date: MetricDate) -> MetricResult<f64>;

    /// Percent change in price between two dates
    fn price_percent_change(
        &self,
        symbol: &str,
        start: MetricDate,
        end: MetricDate,
    ) -> MetricResult<f64>;

    /// Sample stdev of daily percent changes, scaled by sqrt(252)
    fn annualized_stdev(&self, symbol: &str, start: MetricDate, end: MetricDate)
    -> MetricResult<f64>;

    /// Price times basic shares outstanding
    fn market_cap(&self, symbol: &str, date: MetricDate) -> MetricResult<f64>;

    /// Price over basic EPS
    fn pe_ratio(&self, symbol: &str, date: MetricDate) -> MetricResult<f64>;

    /// Price over book value per share
    fn pb_ratio(&self, symbol: &str, date: MetricDate) -> MetricResult<f64>;

    /// Get the provider's name for debugging
    fn name(&self) -> &str {
        "MetricProvider"
    }
}

impl<T: MetricProvider + ?Sized> MetricProvider for Arc<T> {
    fn price(&self, symbol: &str, date: MetricDate) -> MetricResult<f64> {
        (**self).price(symbol, date)
    }

    fn price_percent_change(
        &self,
        symbol: &str,
        start: MetricDate,
        end: MetricDate,
    ) -> MetricResult<f64> {
        (**self).price_percent_change(symbol, start, end)
    }

    fn annualized_stdev(
        &self,
        symbol: &str,
        start: MetricDate,
        end: MetricDate,
    ) -> MetricResult<f64> {
        (**self).annualized_stdev(symbol, start, end)
    }

    fn market_cap(&self, symbol: &str, date: MetricDate) -> MetricResult<f64> {
        (**self).market_cap(symbol, date)
    }

    fn pe_ratio(&self, symbol: &str, date: MetricDate) -> MetricResult<f64> {
        (**self).pe_ratio(symbol, date)
    }

    fn pb_ratio(&self, symbol: &str, date: MetricDate) -> MetricResult<f64> {
        (**self).pb_ratio(symbol, date)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
