//! Dry run followed by a cache prefetch against a real store

use chrono::NaiveDate;
use tilt_core::MetricDate;
use tilt_metrics::{CachedMetrics, DryRunMetrics, Fundamentals, InMemoryMetrics, MetricProvider};

fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn date(y: i32, m: u32, d: u32) -> MetricDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn store() -> InMemoryMetrics {
    let mut store = InMemoryMetrics::new();
    store.add_prices(
        "AAPL",
        vec![
            (date(2020, 1, 1), 100.0),
            (date(2020, 1, 2), 102.0),
            (date(2020, 1, 3), 101.0),
            (date(2020, 1, 6), 104.0),
        ],
    );
    store.add_fundamentals(
        "AAPL",
        date(2019, 12, 1),
        Fundamentals {
            shares_outstanding_basic: Some(1_000.0),
            eps_basic: Some(4.0),
            total_assets: None,
            total_liabilities: None,
        },
    );
    store
}

/// The lookups a momentum-over-value formula would make
fn run_formula(provider: &dyn MetricProvider) -> Vec<bool> {
    vec![
        provider.price("AAPL", date(2020, 1, 6)).is_ok(),
        provider
            .price_percent_change("AAPL", date(2020, 1, 1), date(2020, 1, 6))
            .is_ok(),
        provider
            .annualized_stdev("AAPL", date(2020, 1, 1), date(2020, 1, 6))
            .is_ok(),
        provider.pe_ratio("AAPL", date(2020, 1, 6)).is_ok(),
    ]
}

#[test]
fn test_prefetched_cache_serves_price_lookups() {
    init_test_logging();

    let dry_run = DryRunMetrics::new();
    assert!(run_formula(&dry_run).into_iter().all(|ok| ok));
    let plan = dry_run.plan();
    assert_eq!(plan.prices.len(), 2);
    assert_eq!(plan.stdev_windows.len(), 1);
    assert_eq!(plan.fundamentals.len(), 1);

    let cache = CachedMetrics::new(store());
    // 2 prices + 1 window + 3 fundamentals ratios
    assert_eq!(cache.prefetch(&plan).unwrap(), 6);
    let misses_after_prefetch = cache.misses();

    assert_eq!(cache.price("AAPL", date(2020, 1, 6)), Ok(104.0));
    let change = cache
        .price_percent_change("AAPL", date(2020, 1, 1), date(2020, 1, 6))
        .unwrap();
    assert!((change - 4.0).abs() < 1e-9);
    assert!(cache.annualized_stdev("AAPL", date(2020, 1, 1), date(2020, 1, 6)).is_ok());
    assert_eq!(cache.pe_ratio("AAPL", date(2020, 1, 6)), Ok(26.0));
    assert_eq!(cache.misses(), misses_after_prefetch);
}

#[test]
fn test_prefetch_caches_missing_fundamentals() {
    init_test_logging();

    let dry_run = DryRunMetrics::new();
    dry_run.pb_ratio("AAPL", date(2020, 1, 6)).unwrap();

    let cache = CachedMetrics::new(store());
    cache.prefetch(&dry_run.plan()).unwrap();

    let hits_before = cache.hits();
    let err = cache.pb_ratio("AAPL", date(2020, 1, 6)).unwrap_err();
    assert!(err.is_missing_data());
    assert_eq!(cache.hits(), hits_before + 1);
}
