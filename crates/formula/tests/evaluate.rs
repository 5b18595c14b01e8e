//! Formula evaluation against the in-memory metric store

use chrono::NaiveDate;
use tilt_core::MetricDate;
use tilt_formula::{Formula, FormulaError, FormulaFunction, evaluate, fingerprint};
use tilt_metrics::{Fundamentals, InMemoryMetrics};

fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn date(y: i32, m: u32, d: u32) -> MetricDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn metrics() -> InMemoryMetrics {
    let mut metrics = InMemoryMetrics::new();
    metrics.add_prices(
        "AAPL",
        vec![
            (date(2019, 1, 2), 100.0),
            (date(2019, 12, 30), 140.0),
            (date(2019, 12, 31), 145.0),
            (date(2020, 1, 1), 150.0),
        ],
    );
    metrics.add_fundamentals(
        "AAPL",
        date(2019, 11, 1),
        Fundamentals {
            shares_outstanding_basic: Some(10.0),
            eps_basic: Some(5.0),
            total_assets: Some(500.0),
            total_liabilities: Some(200.0),
        },
    );
    metrics.add_price("NOFUND", date(2020, 1, 1), 20.0);
    metrics
}

#[test]
fn test_price_at_current_date() {
    init_test_logging();

    let evaluation = evaluate("price(currentDate)", "AAPL", date(2020, 1, 1), &metrics()).unwrap();
    assert_eq!(evaluation.score, 150.0);
    assert_eq!(evaluation.trace.get("price"), Some(&[150.0][..]));
    assert_eq!(evaluation.trace.call_count(), 1);
}

#[test]
fn test_trace_is_keyed_by_function_name() {
    init_test_logging();

    let evaluation = evaluate("price(currentDate)", "AAPL", date(2020, 1, 1), &metrics()).unwrap();
    let entries: Vec<(&str, &[f64])> = evaluation.trace.iter().collect();
    assert_eq!(entries, vec![("price", &[150.0][..])]);
}

#[test]
fn test_fundamental_ratios() {
    init_test_logging();
    let metrics = metrics();
    let on = date(2020, 1, 1);

    assert_eq!(evaluate("marketCap(currentDate)", "AAPL", on, &metrics).unwrap().score, 1500.0);
    assert_eq!(evaluate("peRatio(currentDate)", "AAPL", on, &metrics).unwrap().score, 30.0);
    // book per share = (500 - 200) / 10 = 30
    assert_eq!(evaluate("pbRatio(currentDate)", "AAPL", on, &metrics).unwrap().score, 5.0);
}

#[test]
fn test_momentum_formula() {
    init_test_logging();

    let formula = Formula::parse("pricePercentChange(nYearsAgo(1), currentDate)").unwrap();
    // 2019-01-01 has no close; the lookback finds nothing before it either
    let err = formula.evaluate(&metrics(), "AAPL", date(2020, 1, 1)).unwrap_err();
    assert!(err.is_missing_data());

    let formula = Formula::parse("pricePercentChange('2019-01-02', currentDate)").unwrap();
    let evaluation = formula.evaluate(&metrics(), "AAPL", date(2020, 1, 1)).unwrap();
    assert!((evaluation.score - 50.0).abs() < 1e-9);
    assert_eq!(
        formula.metric_functions(),
        vec![FormulaFunction::PricePercentChange]
    );
}

#[test]
fn test_missing_fundamentals_are_missing_data() {
    init_test_logging();

    let err = evaluate("marketCap(currentDate)", "NOFUND", date(2020, 1, 1), &metrics())
        .unwrap_err();
    assert!(err.is_missing_data());
    let missing = err.missing_data().unwrap();
    assert_eq!(missing.symbol, "NOFUND");
    assert_eq!(missing.metric, "marketCap");
}

#[test]
fn test_syntax_error_before_any_lookup() {
    init_test_logging();

    let err = evaluate("price(currentDate", "AAPL", date(2020, 1, 1), &metrics()).unwrap_err();
    assert!(matches!(err, FormulaError::Syntax { .. }));
}

#[test]
fn test_runaway_operator_chain_is_a_syntax_error() {
    init_test_logging();

    let runaway = format!("price(currentDate){}", " + 1".repeat(5_000));
    let err = evaluate(&runaway, "AAPL", date(2020, 1, 1), &metrics()).unwrap_err();
    assert!(matches!(err, FormulaError::Syntax { .. }));

    let modest = format!("price(currentDate){}", " + 1".repeat(100));
    let evaluation = evaluate(&modest, "AAPL", date(2020, 1, 1), &metrics()).unwrap();
    assert_eq!(evaluation.score, 250.0);
}

#[test]
fn test_fingerprint_matches_formula() {
    let formula = Formula::parse("price(currentDate) /  peRatio(currentDate)").unwrap();
    assert_eq!(
        formula.fingerprint(),
        fingerprint("price(currentDate)/peRatio(currentDate)")
    );
}
