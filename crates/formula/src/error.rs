//! Formula errors

use thiserror::Error;
use tilt_ports::{MetricError, MissingDataError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    /// The formula text cannot be parsed
    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    /// The formula parsed but an operation or the result has the wrong type
    #[error("Evaluation type error: {0}")]
    Type(String),

    /// A metric is unavailable; recoverable by excluding the symbol
    #[error(transparent)]
    MissingData(MissingDataError),

    #[error("Metric provider failure: {0}")]
    Provider(String),
}

impl FormulaError {
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        FormulaError::Syntax {
            position,
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        FormulaError::Type(message.into())
    }

    pub fn is_missing_data(&self) -> bool {
        matches!(self, FormulaError::MissingData(_))
    }

    /// The missing-data detail, if this is a missing-data failure
    pub fn missing_data(&self) -> Option<&MissingDataError> {
        match self {
            FormulaError::MissingData(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MetricError> for FormulaError {
    fn from(err: MetricError) -> Self {
        match err {
            MetricError::MissingData(e) => FormulaError::MissingData(e),
            MetricError::Provider(reason) => FormulaError::Provider(reason),
        }
    }
}

pub type FormulaResult<T> = std::result::Result<T, FormulaError>;
