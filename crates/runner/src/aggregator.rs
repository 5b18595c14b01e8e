//! Score Aggregation
//!
//! Runs one parsed formula over a universe on a fixed date. A symbol whose
//! data is missing is left out of the scores and listed as excluded; any
//! other failure aborts the whole aggregation.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use tilt_core::{EvaluationTrace, MetricDate, ScoreMap, Symbol, format_iso_date};
use tilt_formula::{Evaluation, Formula, FormulaResult};
use tilt_ports::MetricProvider;

use crate::error::{Error, Result};

/// A symbol left out of the scores because its data was missing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    pub symbol: Symbol,
    pub metric: String,
    pub reason: String,
}

/// Scores for one date, with traces and the symbols that were dropped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSheet {
    pub date: MetricDate,
    pub scores: ScoreMap,
    pub traces: BTreeMap<Symbol, EvaluationTrace>,
    pub excluded: Vec<Exclusion>,
}

impl ScoreSheet {
    pub fn new(date: MetricDate) -> Self {
        Self {
            date,
            scores: ScoreMap::new(),
            traces: BTreeMap::new(),
            excluded: Vec::new(),
        }
    }

    pub fn scored_count(&self) -> usize {
        self.scores.len()
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded.len()
    }

    pub fn is_excluded(&self, symbol: &str) -> bool {
        self.excluded.iter().any(|e| e.symbol == symbol)
    }

    /// Fold one evaluation outcome into the sheet
    ///
    /// Missing data becomes an exclusion; every other error is returned.
    pub fn record(&mut self, symbol: Symbol, outcome: FormulaResult<Evaluation>) -> Result<()> {
        match outcome {
            Ok(evaluation) => {
                self.scores.insert(symbol.clone(), evaluation.score);
                self.traces.insert(symbol, evaluation.trace);
                Ok(())
            }
            Err(e) => match e.missing_data() {
                Some(missing) => {
                    debug!("Excluding {} on {}: {}", symbol, self.date, missing);
                    self.excluded.push(Exclusion {
                        symbol,
                        metric: missing.metric.clone(),
                        reason: missing.detail.clone(),
                    });
                    Ok(())
                }
                None => Err(e.into()),
            },
        }
    }
}

/// Each symbol once, in a stable order
fn distinct(universe: &[Symbol]) -> BTreeSet<Symbol> {
    universe.iter().cloned().collect()
}

fn log_summary(sheet: &ScoreSheet) {
    info!(
        "Scored {} symbols on {}, excluded {}",
        sheet.scored_count(),
        format_iso_date(sheet.date),
        sheet.excluded_count()
    );
}

/// Score every symbol in `universe` one after another
pub fn score_universe(
    provider: &dyn MetricProvider,
    formula: &Formula,
    universe: &[Symbol],
    date: MetricDate,
) -> Result<ScoreSheet> {
    let mut sheet = ScoreSheet::new(date);
    for symbol in distinct(universe) {
        let outcome = formula.evaluate(provider, &symbol, date);
        sheet.record(symbol, outcome)?;
    }
    log_summary(&sheet);
    Ok(sheet)
}

/// Score `universe` with at most `max_concurrency` evaluations in flight
///
/// Evaluations run on tokio's blocking pool since providers may block on
/// I/O. The first error that is not missing data cancels whatever has not
/// started yet. The sheet is identical to [`score_universe`]'s.
pub async fn score_universe_concurrent(
    provider: Arc<dyn MetricProvider>,
    formula: Arc<Formula>,
    universe: &[Symbol],
    date: MetricDate,
    max_concurrency: usize,
) -> Result<ScoreSheet> {
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for symbol in distinct(universe) {
        let semaphore = semaphore.clone();
        let provider = provider.clone();
        let formula = formula.clone();

        tasks.spawn(async move {
            let outcome = match semaphore.acquire_owned().await {
                Ok(_permit) => {
                    let target = symbol.clone();
                    tokio::task::spawn_blocking(move || {
                        formula.evaluate(provider.as_ref(), &target, date)
                    })
                    .await
                    .map_err(|e| Error::Task(e.to_string()))
                }
                Err(e) => Err(Error::Task(e.to_string())),
            };
            (symbol, outcome)
        });
    }

    let mut outcomes = BTreeMap::new();
    while let Some(joined) = tasks.join_next().await {
        let (symbol, outcome) = match joined {
            Ok(done) => done,
            Err(e) => {
                tasks.abort_all();
                return Err(Error::Task(e.to_string()));
            }
        };

        let outcome = match outcome {
            Ok(Err(e)) if !e.is_missing_data() => {
                warn!("Aborting aggregation on {}: {} failed with {}", date, symbol, e);
                tasks.abort_all();
                return Err(e.into());
            }
            Ok(outcome) => outcome,
            Err(e) => {
                tasks.abort_all();
                return Err(e);
            }
        };
        outcomes.insert(symbol, outcome);
    }

    let mut sheet = ScoreSheet::new(date);
    for (symbol, outcome) in outcomes {
        sheet.record(symbol, outcome)?;
    }
    log_summary(&sheet);
    Ok(sheet)
}

/// One sheet per date; the first fatal error on any date aborts the run
pub fn score_trading_days(
    provider: &dyn MetricProvider,
    formula: &Formula,
    universe: &[Symbol],
    dates: &[MetricDate],
) -> Result<BTreeMap<MetricDate, ScoreSheet>> {
    let mut sheets = BTreeMap::new();
    for &date in dates {
        if sheets.contains_key(&date) {
            continue;
        }
        sheets.insert(date, score_universe(provider, formula, universe, date)?);
    }
    Ok(sheets)
}
