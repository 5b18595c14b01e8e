//! Descriptive statistics shared by metric providers and the allocator
//!
//! Plain `f64` helpers. Functions that are undefined for the given input
//! return `None` rather than NaN.

/// Trading days used to annualize daily volatility
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator), needs at least two values
pub fn sample_stdev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mu = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - mu).powi(2)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Standardized distance from the mean
#[inline]
pub fn z_score(value: f64, mean: f64, stdev: f64) -> f64 {
    (value - mean) / stdev
}

/// Percent change from `start` to `end`, `None` when `start` is zero
#[inline]
pub fn percent_change(start: f64, end: f64) -> Option<f64> {
    if start == 0.0 {
        return None;
    }
    Some((end - start) / start * 100.0)
}

/// Annualized sample stdev of a daily series
pub fn annualized_stdev(daily: &[f64]) -> Option<f64> {
    sample_stdev(daily).map(|s| s * TRADING_DAYS_PER_YEAR.sqrt())
}

/// True when every value equals the first (empty and singleton included)
pub fn all_equal(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}
