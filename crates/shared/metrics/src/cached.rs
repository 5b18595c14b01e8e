use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info};
use tilt_core::{MetricDate, Symbol, stats};
use tilt_ports::{MetricCapability, MetricError, MetricProvider, MetricResult};

use crate::dry_run::FetchPlan;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    capability: MetricCapability,
    symbol: Symbol,
    start: MetricDate,
    end: Option<MetricDate>,
}

/// Memoizing decorator over another provider
///
/// Missing-data answers are cached like values; provider failures are not,
/// so a transient error is retried on the next lookup. Percent changes are
/// derived from the cached endpoint prices.
pub struct CachedMetrics<P> {
    inner: P,
    entries: DashMap<CacheKey, MetricResult<f64>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<P: MetricProvider> CachedMetrics<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn lookup<F>(&self, key: CacheKey, fetch: F) -> MetricResult<f64>
    where
        F: FnOnce(&P) -> MetricResult<f64>,
    {
        if let Some(entry) = self.entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return entry.value().clone();
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let result = fetch(&self.inner);
        match &result {
            Ok(_) | Err(MetricError::MissingData(_)) => {
                self.entries.insert(key, result.clone());
            }
            Err(MetricError::Provider(reason)) => {
                debug!("Not caching {} for {}: {}", key.capability, key.symbol, reason);
            }
        }
        result
    }

    /// Warm the cache with everything a plan lists
    ///
    /// Returns the number of lookups made. Stops at the first provider
    /// failure; missing data is cached and does not stop the prefetch.
    pub fn prefetch(&self, plan: &FetchPlan) -> MetricResult<usize> {
        let mut fetched = 0;

        for (symbol, date) in &plan.prices {
            fetched += self.warm(self.price(symbol, *date))?;
        }
        for (symbol, start, end) in &plan.stdev_windows {
            fetched += self.warm(self.annualized_stdev(symbol, *start, *end))?;
        }
        for (symbol, date) in &plan.fundamentals {
            fetched += self.warm(self.market_cap(symbol, *date))?;
            fetched += self.warm(self.pe_ratio(symbol, *date))?;
            fetched += self.warm(self.pb_ratio(symbol, *date))?;
        }

        info!(
            "Prefetched {} metric lookups from {} ({} cached)",
            fetched,
            self.inner.name(),
            self.entries.len()
        );
        Ok(fetched)
    }

    fn warm(&self, result: MetricResult<f64>) -> MetricResult<usize> {
        match result {
            Ok(_) | Err(MetricError::MissingData(_)) => Ok(1),
            Err(e) => Err(e),
        }
    }
}

fn point(capability: MetricCapability, symbol: &str, date: MetricDate) -> CacheKey {
    CacheKey {
        capability,
        symbol: symbol.to_string(),
        start: date,
        end: None,
    }
}

fn window(
    capability: MetricCapability,
    symbol: &str,
    start: MetricDate,
    end: MetricDate,
) -> CacheKey {
    CacheKey {
        capability,
        symbol: symbol.to_string(),
        start,
        end: Some(end),
    }
}

/// Report missing data under the metric the caller asked for
fn relabel(error: MetricError, metric: MetricCapability) -> MetricError {
    match error {
        MetricError::MissingData(mut missing) => {
            missing.metric = metric.name().to_string();
            MetricError::MissingData(missing)
        }
        other => other,
    }
}

impl<P: MetricProvider> MetricProvider for CachedMetrics<P> {
    fn price(&self, symbol: &str, date: MetricDate) -> MetricResult<f64> {
        self.lookup(point(MetricCapability::Price, symbol, date), |p| {
            p.price(symbol, date)
        })
    }

    fn price_percent_change(
        &self,
        symbol: &str,
        start: MetricDate,
        end: MetricDate,
    ) -> MetricResult<f64> {
        let metric = MetricCapability::PricePercentChange;
        let start_price = self.price(symbol, start).map_err(|e| relabel(e, metric))?;
        let end_price = self.price(symbol, end).map_err(|e| relabel(e, metric))?;
        stats::percent_change(start_price, end_price)
            .ok_or_else(|| MetricError::missing(symbol, metric.name(), "start price is zero"))
    }

    fn annualized_stdev(
        &self,
        symbol: &str,
        start: MetricDate,
        end: MetricDate,
    ) -> MetricResult<f64> {
        let key = window(MetricCapability::AnnualizedStdev, symbol, start, end);
        self.lookup(key, |p| p.annualized_stdev(symbol, start, end))
    }

    fn market_cap(&self, symbol: &str, date: MetricDate) -> MetricResult<f64> {
        self.lookup(point(MetricCapability::MarketCap, symbol, date), |p| {
            p.market_cap(symbol, date)
        })
    }

    fn pe_ratio(&self, symbol: &str, date: MetricDate) -> MetricResult<f64> {
        self.lookup(point(MetricCapability::PeRatio, symbol, date), |p| {
            p.pe_ratio(symbol, date)
        })
    }

    fn pb_ratio(&self, symbol: &str, date: MetricDate) -> MetricResult<f64> {
        self.lookup(point(MetricCapability::PbRatio, symbol, date), |p| {
            p.pb_ratio(symbol, date)
        })
    }

    fn name(&self) -> &str {
        "CachedMetrics"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryMetrics;
    use chrono::NaiveDate;
    use std::sync::atomic::AtomicUsize;

    fn date(y: i32, m: u32, d: u32) -> MetricDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Fails every call and counts them
    #[derive(Default)]
    struct FlakyMetrics {
        calls: AtomicUsize,
    }

    impl FlakyMetrics {
        fn fail(&self) -> MetricResult<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(MetricError::Provider("connection reset".to_string()))
        }
    }

    impl MetricProvider for FlakyMetrics {
        fn price(&self, _: &str, _: MetricDate) -> MetricResult<f64> {
            self.fail()
        }
        fn price_percent_change(&self, _: &str, _: MetricDate, _: MetricDate) -> MetricResult<f64> {
            self.fail()
        }
        fn annualized_stdev(&self, _: &str, _: MetricDate, _: MetricDate) -> MetricResult<f64> {
            self.fail()
        }
        fn market_cap(&self, _: &str, _: MetricDate) -> MetricResult<f64> {
            self.fail()
        }
        fn pe_ratio(&self, _: &str, _: MetricDate) -> MetricResult<f64> {
            self.fail()
        }
        fn pb_ratio(&self, _: &str, _: MetricDate) -> MetricResult<f64> {
            self.fail()
        }
    }

    #[test]
    fn test_second_lookup_is_a_hit() {
        let source = InMemoryMetrics::new().with_price("AAPL", date(2020, 1, 2), 150.0);
        let cache = CachedMetrics::new(source);

        assert_eq!(cache.price("AAPL", date(2020, 1, 2)), Ok(150.0));
        assert_eq!(cache.price("AAPL", date(2020, 1, 2)), Ok(150.0));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_data_is_cached() {
        let cache = CachedMetrics::new(InMemoryMetrics::new());

        let first = cache.market_cap("AAPL", date(2020, 1, 2)).unwrap_err();
        assert!(first.is_missing_data());
        let second = cache.market_cap("AAPL", date(2020, 1, 2)).unwrap_err();
        assert_eq!(first, second);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn test_provider_failure_is_not_cached() {
        let cache = CachedMetrics::new(FlakyMetrics::default());

        assert!(cache.price("AAPL", date(2020, 1, 2)).is_err());
        assert!(cache.price("AAPL", date(2020, 1, 2)).is_err());
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_percent_change_shares_endpoint_prices() {
        let source = InMemoryMetrics::new()
            .with_price("AAPL", date(2020, 1, 1), 100.0)
            .with_price("AAPL", date(2020, 1, 2), 110.0)
            .with_price("AAPL", date(2020, 1, 3), 121.0);
        let cache = CachedMetrics::new(source);

        let a = cache
            .price_percent_change("AAPL", date(2020, 1, 1), date(2020, 1, 2))
            .unwrap();
        let b = cache
            .price_percent_change("AAPL", date(2020, 1, 1), date(2020, 1, 3))
            .unwrap();
        assert!((a - 10.0).abs() < 1e-9);
        assert!((b - 21.0).abs() < 1e-9);
        // Three distinct prices, the shared start price fetched once
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.misses(), 3);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn test_percent_change_reports_its_own_metric() {
        let source = InMemoryMetrics::new()
            .with_price("ZERO", date(2020, 1, 1), 0.0)
            .with_price("ZERO", date(2020, 1, 2), 5.0)
            .with_price("LATE", date(2020, 1, 2), 5.0);
        let cache = CachedMetrics::new(source);

        let late = cache
            .price_percent_change("LATE", date(2020, 1, 1), date(2020, 1, 2))
            .unwrap_err();
        assert!(matches!(
            late,
            MetricError::MissingData(ref missing) if missing.metric == "pricePercentChange"
        ));
        let zero = cache
            .price_percent_change("ZERO", date(2020, 1, 1), date(2020, 1, 2))
            .unwrap_err();
        assert!(zero.is_missing_data());
        assert!(zero.to_string().contains("start price is zero"));
    }

    #[test]
    fn test_prefetch_stops_on_provider_failure() {
        let mut plan = FetchPlan::default();
        plan.prices.insert(("AAPL".to_string(), date(2020, 1, 2)));

        let cache = CachedMetrics::new(FlakyMetrics::default());
        assert!(matches!(cache.prefetch(&plan), Err(MetricError::Provider(_))));
    }
}
