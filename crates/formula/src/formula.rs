use log::debug;

use tilt_core::MetricDate;
use tilt_ports::MetricProvider;

use crate::ast::Expr;
use crate::error::FormulaResult;
use crate::evaluator::{Evaluation, EvaluationContext};
use crate::fingerprint::fingerprint;
use crate::functions::FormulaFunction;
use crate::parser;

/// A parsed factor formula, ready to evaluate against any symbol and date
///
/// Parsing happens once; evaluation is read-only, so one `Formula` can be
/// shared across worker threads.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    root: Expr,
}

impl Formula {
    pub fn parse(source: &str) -> FormulaResult<Self> {
        let root = parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.source)
    }

    /// Metric functions the formula may call, deduplicated
    pub fn metric_functions(&self) -> Vec<FormulaFunction> {
        let mut functions = Vec::new();
        for function in self.root.functions() {
            if function.capability().is_some() && !functions.contains(&function) {
                functions.push(function);
            }
        }
        functions
    }

    /// Score one symbol as of `date`
    pub fn evaluate(
        &self,
        provider: &dyn MetricProvider,
        symbol: &str,
        date: MetricDate,
    ) -> FormulaResult<Evaluation> {
        let result = EvaluationContext::new(provider, symbol, date).evaluate(&self.root);
        match &result {
            Ok(evaluation) => debug!(
                "{} on {}: score={} ({} metric calls)",
                symbol,
                date,
                evaluation.score,
                evaluation.trace.call_count()
            ),
            Err(e) => debug!("{} on {}: {}", symbol, date, e),
        }
        result
    }
}

/// Parse and evaluate in one step
pub fn evaluate(
    expression: &str,
    symbol: &str,
    date: MetricDate,
    metrics: &dyn MetricProvider,
) -> FormulaResult<Evaluation> {
    Formula::parse(expression)?.evaluate(metrics, symbol, date)
}
