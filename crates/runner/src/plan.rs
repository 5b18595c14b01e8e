//! Data planning
//!
//! Evaluates a formula against [`DryRunMetrics`] to learn which prices,
//! volatility windows and filings a real run will read. Placeholder values
//! steer conditionals, so a branch the placeholders skip is not planned;
//! such lookups still work, they just miss the prefetch. Placeholders can
//! also make a formula fail (a zero divisor, say); the lookups made before
//! the failure are still planned.

use log::{debug, info};

use tilt_core::{MetricDate, Symbol};
use tilt_formula::{Formula, FormulaError};
use tilt_metrics::{CachedMetrics, DryRunMetrics, FetchPlan, MetricProvider};

use crate::error::Result;

/// Everything `formula` reads for `universe` across `dates`
pub fn plan_data_requirements(
    formula: &Formula,
    universe: &[Symbol],
    dates: &[MetricDate],
) -> Result<FetchPlan> {
    if formula.metric_functions().is_empty() {
        info!("Formula {} reads no metrics, nothing to plan", formula.fingerprint());
        return Ok(FetchPlan::default());
    }

    let dry_run = DryRunMetrics::new();
    for &date in dates {
        for symbol in universe {
            match formula.evaluate(&dry_run, symbol, date) {
                Ok(_) => {}
                Err(e @ FormulaError::Provider(_)) => return Err(e.into()),
                Err(e) => debug!("Dry run for {} on {} stopped early: {}", symbol, date, e),
            }
        }
    }

    let plan = dry_run.plan();
    info!(
        "Planned {} prices, {} stdev windows, {} filings from {} dry-run lookups",
        plan.prices.len(),
        plan.stdev_windows.len(),
        plan.fundamentals.len(),
        dry_run.request_count()
    );
    Ok(plan)
}

/// Wrap `provider` in a cache warmed with everything the plan names
pub fn prefetched<P: MetricProvider>(provider: P, plan: &FetchPlan) -> Result<CachedMetrics<P>> {
    let cache = CachedMetrics::new(provider);
    cache.prefetch(plan)?;
    Ok(cache)
}
