use chrono::{NaiveDate, TimeDelta};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use tilt_core::{MetricDate, Symbol, format_iso_date, stats};
use tilt_ports::{MetricCapability, MetricError, MetricProvider, MetricResult};

/// Calendar days a price lookup may reach back (weekends, holidays)
pub const PRICE_LOOKBACK_DAYS: i64 = 3;

/// One fundamentals filing; any field may be unreported
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    #[serde(default)]
    pub shares_outstanding_basic: Option<f64>,
    #[serde(default)]
    pub eps_basic: Option<f64>,
    #[serde(default)]
    pub total_assets: Option<f64>,
    #[serde(default)]
    pub total_liabilities: Option<f64>,
}

/// Point-in-time metric store backed by in-memory series
///
/// Prices are adjusted daily closes. Fundamentals are filings keyed by the
/// date they became known; a query sees the latest filing on or before its
/// date, never a later one.
#[derive(Debug, Clone)]
pub struct InMemoryMetrics {
    prices: HashMap<Symbol, BTreeMap<MetricDate, f64>>,
    fundamentals: HashMap<Symbol, BTreeMap<MetricDate, Fundamentals>>,
    lookback_days: i64,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            fundamentals: HashMap::new(),
            lookback_days: PRICE_LOOKBACK_DAYS,
        }
    }

    /// Override how far back a price lookup may reach
    pub fn with_lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = days.max(0);
        self
    }

    pub fn add_price(&mut self, symbol: impl Into<Symbol>, date: MetricDate, price: f64) {
        self.prices
            .entry(symbol.into())
            .or_default()
            .insert(date, price);
    }

    pub fn add_prices<I>(&mut self, symbol: impl Into<Symbol>, series: I)
    where
        I: IntoIterator<Item = (MetricDate, f64)>,
    {
        self.prices.entry(symbol.into()).or_default().extend(series);
    }

    pub fn add_fundamentals(
        &mut self,
        symbol: impl Into<Symbol>,
        known_on: MetricDate,
        filing: Fundamentals,
    ) {
        self.fundamentals
            .entry(symbol.into())
            .or_default()
            .insert(known_on, filing);
    }

    /// Builder form of [`add_price`](Self::add_price)
    pub fn with_price(mut self, symbol: impl Into<Symbol>, date: MetricDate, price: f64) -> Self {
        self.add_price(symbol, date, price);
        self
    }

    /// Builder form of [`add_fundamentals`](Self::add_fundamentals)
    pub fn with_fundamentals(
        mut self,
        symbol: impl Into<Symbol>,
        known_on: MetricDate,
        filing: Fundamentals,
    ) -> Self {
        self.add_fundamentals(symbol, known_on, filing);
        self
    }

    /// Symbols with at least one price
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.prices.keys()
    }

    fn series(
        &self,
        symbol: &str,
        metric: MetricCapability,
    ) -> MetricResult<&BTreeMap<MetricDate, f64>> {
        self.prices
            .get(symbol)
            .ok_or_else(|| MetricError::missing(symbol, metric.name(), "no price history"))
    }

    fn lookup_price(
        &self,
        symbol: &str,
        date: MetricDate,
        metric: MetricCapability,
    ) -> MetricResult<f64> {
        let series = self.series(symbol, metric)?;
        let earliest = TimeDelta::try_days(self.lookback_days)
            .and_then(|lookback| date.checked_sub_signed(lookback))
            .unwrap_or(NaiveDate::MIN);

        series
            .range(earliest..=date)
            .next_back()
            .map(|(_, price)| *price)
            .ok_or_else(|| {
                MetricError::missing(
                    symbol,
                    metric.name(),
                    format!(
                        "no price within {} days of {}",
                        self.lookback_days,
                        format_iso_date(date)
                    ),
                )
            })
    }

    fn filing(
        &self,
        symbol: &str,
        date: MetricDate,
        metric: MetricCapability,
    ) -> MetricResult<&Fundamentals> {
        self.fundamentals
            .get(symbol)
            .and_then(|filings| filings.range(..=date).next_back())
            .map(|(_, filing)| filing)
            .ok_or_else(|| {
                MetricError::missing(
                    symbol,
                    metric.name(),
                    format!("no fundamentals known on {}", format_iso_date(date)),
                )
            })
    }
}

impl Default for InMemoryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn require(
    value: Option<f64>,
    symbol: &str,
    metric: MetricCapability,
    field: &str,
) -> MetricResult<f64> {
    value.ok_or_else(|| {
        MetricError::missing(symbol, metric.name(), format!("{} not reported", field))
    })
}

fn nonzero(value: f64, symbol: &str, metric: MetricCapability, field: &str) -> MetricResult<f64> {
    if value == 0.0 {
        return Err(MetricError::missing(
            symbol,
            metric.name(),
            format!("{} is zero", field),
        ));
    }
    Ok(value)
}

impl MetricProvider for InMemoryMetrics {
    fn price(&self, symbol: &str, date: MetricDate) -> MetricResult<f64> {
        self.lookup_price(symbol, date, MetricCapability::Price)
    }

    fn price_percent_change(
        &self,
        symbol: &str,
        start: MetricDate,
        end: MetricDate,
    ) -> MetricResult<f64> {
        let metric = MetricCapability::PricePercentChange;
        let start_price = self.lookup_price(symbol, start, metric)?;
        let end_price = self.lookup_price(symbol, end, metric)?;
        stats::percent_change(start_price, end_price)
            .ok_or_else(|| MetricError::missing(symbol, metric.name(), "start price is zero"))
    }

    fn annualized_stdev(
        &self,
        symbol: &str,
        start: MetricDate,
        end: MetricDate,
    ) -> MetricResult<f64> {
        let metric = MetricCapability::AnnualizedStdev;
        let series = self.series(symbol, metric)?;
        if start > end {
            return Err(MetricError::missing(
                symbol,
                metric.name(),
                "window ends before it starts",
            ));
        }

        let closes: Vec<f64> = series.range(start..=end).map(|(_, p)| *p).collect();
        let mut daily_changes = Vec::with_capacity(closes.len().saturating_sub(1));
        for pair in closes.windows(2) {
            let change = stats::percent_change(pair[0], pair[1]).ok_or_else(|| {
                MetricError::missing(symbol, metric.name(), "zero price in window")
            })?;
            daily_changes.push(change);
        }

        let stdev = stats::annualized_stdev(&daily_changes).ok_or_else(|| {
            MetricError::missing(
                symbol,
                metric.name(),
                format!("{} prices in window, need at least 3", closes.len()),
            )
        })?;
        debug!("{}: stdev over {} daily changes = {}", symbol, daily_changes.len(), stdev);
        Ok(stdev)
    }

    fn market_cap(&self, symbol: &str, date: MetricDate) -> MetricResult<f64> {
        let metric = MetricCapability::MarketCap;
        let filing = self.filing(symbol, date, metric)?;
        let price = self.lookup_price(symbol, date, metric)?;
        let shares = require(
            filing.shares_outstanding_basic,
            symbol,
            metric,
            "shares outstanding",
        )?;
        Ok(price * shares)
    }

    fn pe_ratio(&self, symbol: &str, date: MetricDate) -> MetricResult<f64> {
        let metric = MetricCapability::PeRatio;
        let price = self.lookup_price(symbol, date, metric)?;
        let filing = self.filing(symbol, date, metric)?;
        let eps = require(filing.eps_basic, symbol, metric, "basic EPS")?;
        Ok(price / nonzero(eps, symbol, metric, "basic EPS")?)
    }

    fn pb_ratio(&self, symbol: &str, date: MetricDate) -> MetricResult<f64> {
        let metric = MetricCapability::PbRatio;
        let price = self.lookup_price(symbol, date, metric)?;
        let filing = self.filing(symbol, date, metric)?;
        let assets = require(filing.total_assets, symbol, metric, "total assets")?;
        let liabilities = require(filing.total_liabilities, symbol, metric, "total liabilities")?;
        let shares = require(
            filing.shares_outstanding_basic,
            symbol,
            metric,
            "shares outstanding",
        )?;

        let book_per_share =
            (assets - liabilities) / nonzero(shares, symbol, metric, "shares outstanding")?;
        Ok(price / nonzero(book_per_share, symbol, metric, "book value")?)
    }

    fn name(&self) -> &str {
        "InMemoryMetrics"
    }
}
