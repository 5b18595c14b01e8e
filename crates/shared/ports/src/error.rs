use thiserror::Error;

/// A metric is not (yet) known for a symbol at a point in time
///
/// Recoverable: callers drop the symbol rather than failing the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Missing {metric} data for {symbol}: {detail}")]
pub struct MissingDataError {
    pub symbol: String,
    pub metric: String,
    pub detail: String,
}

/// Errors surfaced by a metric provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricError {
    #[error(transparent)]
    MissingData(#[from] MissingDataError),

    #[error("Metric provider failure: {0}")]
    Provider(String),
}

impl MetricError {
    pub fn missing(
        symbol: impl Into<String>,
        metric: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        MetricError::MissingData(MissingDataError {
            symbol: symbol.into(),
            metric: metric.into(),
            detail: detail.into(),
        })
    }

    pub fn is_missing_data(&self) -> bool {
        matches!(self, MetricError::MissingData(_))
    }
}

pub type MetricResult<T> = std::result::Result<T, MetricError>;
