//! Tree-walking evaluator
//!
//! Every call threads an explicit [`EvaluationContext`] holding the provider
//! handle, the bound symbol and date, and the trace being accumulated. There
//! is no other state, so independent evaluations never interact.

use std::fmt;

use tilt_core::{EvaluationTrace, MetricDate, add_calendar, format_iso_date, parse_iso_date};
use tilt_ports::MetricProvider;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::FormulaFunction;

/// Largest magnitude accepted where a whole number is expected
const MAX_INTEGER_ARG: f64 = 1e15;

/// Runtime value of a sub-expression
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    /// Strings; dates travel as ISO `YYYY-MM-DD` text
    Text(String),
    Bool(bool),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "string",
            Value::Bool(_) => "boolean",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "'{}'", s),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Result of one successful evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub score: f64,
    pub trace: EvaluationTrace,
}

/// Everything one evaluation may touch
pub struct EvaluationContext<'a> {
    provider: &'a dyn MetricProvider,
    symbol: &'a str,
    date: MetricDate,
    trace: EvaluationTrace,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(provider: &'a dyn MetricProvider, symbol: &'a str, date: MetricDate) -> Self {
        Self {
            provider,
            symbol,
            date,
            trace: EvaluationTrace::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        self.symbol
    }

    pub fn date(&self) -> MetricDate {
        self.date
    }

    pub fn trace(&self) -> &EvaluationTrace {
        &self.trace
    }

    /// Evaluate `expr` to a finite score, consuming the context
    pub fn evaluate(mut self, expr: &Expr) -> FormulaResult<Evaluation> {
        let score = match self.eval(expr)? {
            Value::Number(n) if n.is_finite() => n,
            Value::Number(n) => {
                return Err(FormulaError::type_error(format!(
                    "formula result is not finite ({})",
                    n
                )));
            }
            other => {
                return Err(FormulaError::type_error(format!(
                    "formula result must be a number, got {} {}",
                    other.type_name(),
                    other
                )));
            }
        };

        Ok(Evaluation {
            score,
            trace: self.trace,
        })
    }

    fn eval(&mut self, expr: &Expr) -> FormulaResult<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Text(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::CurrentDate => Ok(Value::Text(format_iso_date(self.date))),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                unary(*op, value)
            }
            Expr::Binary {
                op: BinaryOp::And,
                left,
                right,
            } => {
                if !self.eval_bool(left, "&&")? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval_bool(right, "&&")?))
            }
            Expr::Binary {
                op: BinaryOp::Or,
                left,
                right,
            } => {
                if self.eval_bool(left, "||")? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval_bool(right, "||")?))
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, left, right)
            }
            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval_bool(condition, "?:")? {
                    self.eval(then_branch)
                } else {
                    self.eval(else_branch)
                }
            }
            Expr::Call { function, args } => self.call(*function, args),
        }
    }

    fn eval_bool(&mut self, expr: &Expr, operator: &str) -> FormulaResult<bool> {
        match self.eval(expr)? {
            Value::Bool(b) => Ok(b),
            other => Err(FormulaError::type_error(format!(
                "{} expects boolean operands, got {} {}",
                operator,
                other.type_name(),
                other
            ))),
        }
    }

    fn date_arg(&mut self, function: FormulaFunction, expr: &Expr) -> FormulaResult<MetricDate> {
        match self.eval(expr)? {
            Value::Text(text) => parse_iso_date(&text).ok_or_else(|| {
                FormulaError::type_error(format!(
                    "{} expects an ISO date (YYYY-MM-DD), got '{}'",
                    function, text
                ))
            }),
            other => Err(FormulaError::type_error(format!(
                "{} expects a date argument, got {} {}",
                function,
                other.type_name(),
                other
            ))),
        }
    }

    fn integer_arg(&mut self, function: FormulaFunction, expr: &Expr) -> FormulaResult<i64> {
        match self.eval(expr)? {
            Value::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_INTEGER_ARG => Ok(n as i64),
            other => Err(FormulaError::type_error(format!(
                "{} expects a whole number, got {} {}",
                function,
                other.type_name(),
                other
            ))),
        }
    }

    fn call(&mut self, function: FormulaFunction, args: &[Expr]) -> FormulaResult<Value> {
        use FormulaFunction as F;

        let value = match (function, args) {
            (F::AddDate, [from, years, months, days]) => {
                let from = self.date_arg(function, from)?;
                let years = self.integer_arg(function, years)?;
                let months = self.integer_arg(function, months)?;
                let days = self.integer_arg(function, days)?;
                return shift_date(function, from, years, months, days);
            }
            (F::NDaysAgo, [n]) => {
                let n = self.integer_arg(function, n)?;
                return shift_date(function, self.date, 0, 0, -n);
            }
            (F::NMonthsAgo, [n]) => {
                let n = self.integer_arg(function, n)?;
                return shift_date(function, self.date, 0, -n, 0);
            }
            (F::NYearsAgo, [n]) => {
                let n = self.integer_arg(function, n)?;
                return shift_date(function, self.date, -n, 0, 0);
            }
            (F::Price, [date]) => {
                let date = self.date_arg(function, date)?;
                self.provider.price(self.symbol, date)?
            }
            (F::PricePercentChange, [start, end]) => {
                let start = self.date_arg(function, start)?;
                let end = self.date_arg(function, end)?;
                self.provider.price_percent_change(self.symbol, start, end)?
            }
            (F::Stdev, [start, end]) => {
                let start = self.date_arg(function, start)?;
                let end = self.date_arg(function, end)?;
                self.provider.annualized_stdev(self.symbol, start, end)?
            }
            (F::MarketCap, [date]) => {
                let date = self.date_arg(function, date)?;
                self.provider.market_cap(self.symbol, date)?
            }
            (F::PeRatio, [date]) => {
                let date = self.date_arg(function, date)?;
                self.provider.pe_ratio(self.symbol, date)?
            }
            (F::PbRatio, [date]) => {
                let date = self.date_arg(function, date)?;
                self.provider.pb_ratio(self.symbol, date)?
            }
            _ => {
                return Err(FormulaError::type_error(format!(
                    "{} expects {} argument(s), got {}",
                    function,
                    function.arity(),
                    args.len()
                )));
            }
        };

        self.trace.record(function.name(), value);
        Ok(Value::Number(value))
    }
}

fn shift_date(
    function: FormulaFunction,
    from: MetricDate,
    years: i64,
    months: i64,
    days: i64,
) -> FormulaResult<Value> {
    add_calendar(from, years, months, days)
        .map(|date| Value::Text(format_iso_date(date)))
        .ok_or_else(|| FormulaError::type_error(format!("{} leaves the calendar range", function)))
}

fn unary(op: UnaryOp, value: Value) -> FormulaResult<Value> {
    match (op, value) {
        (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
        (UnaryOp::Plus, Value::Number(n)) => Ok(Value::Number(n)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (op, other) => {
            let symbol = match op {
                UnaryOp::Neg => "-",
                UnaryOp::Plus => "+",
                UnaryOp::Not => "!",
            };
            Err(FormulaError::type_error(format!(
                "unary {} cannot be applied to {} {}",
                symbol,
                other.type_name(),
                other
            )))
        }
    }
}

fn mismatch(op: BinaryOp, left: &Value, right: &Value) -> FormulaError {
    FormulaError::type_error(format!(
        "{} cannot be applied to {} {} and {} {}",
        op,
        left.type_name(),
        left,
        right.type_name(),
        right
    ))
}

fn binary(op: BinaryOp, left: Value, right: Value) -> FormulaResult<Value> {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            let (Value::Number(a), Value::Number(b)) = (&left, &right) else {
                return Err(mismatch(op, &left, &right));
            };
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            };
            Ok(Value::Number(result))
        }
        BinaryOp::Eq | BinaryOp::NotEq => {
            if left.type_name() != right.type_name() {
                return Err(mismatch(op, &left, &right));
            }
            let equal = left == right;
            Ok(Value::Bool(if op == BinaryOp::Eq { equal } else { !equal }))
        }
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            compare(op, &left, &right)
        }
        BinaryOp::And | BinaryOp::Or => match (&left, &right) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(if op == BinaryOp::And {
                *a && *b
            } else {
                *a || *b
            })),
            _ => Err(mismatch(op, &left, &right)),
        },
    }
}

/// Ordering comparison of two numbers or two ISO dates
fn compare(op: BinaryOp, left: &Value, right: &Value) -> FormulaResult<Value> {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Text(a), Value::Text(b)) => match (parse_iso_date(a), parse_iso_date(b)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => {
                return Err(FormulaError::type_error(format!(
                    "{} compares numbers or ISO dates, got {} and {}",
                    op, left, right
                )));
            }
        },
        _ => return Err(mismatch(op, left, right)),
    };
    Ok(Value::Bool(ordered(op, ordering)))
}

/// Comparisons involving NaN are false
fn ordered(op: BinaryOp, ordering: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering::*;

    match (op, ordering) {
        (_, None) => false,
        (BinaryOp::Lt, Some(o)) => o == Less,
        (BinaryOp::LtEq, Some(o)) => o != Greater,
        (BinaryOp::Gt, Some(o)) => o == Greater,
        (BinaryOp::GtEq, Some(o)) => o != Less,
        _ => false,
    }
}
