//! The closed set of functions a formula may call

use std::fmt;

use tilt_ports::MetricCapability;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormulaFunction {
    // Metric lookups
    Price,
    PricePercentChange,
    Stdev,
    MarketCap,
    PeRatio,
    PbRatio,

    // Calendar arithmetic
    AddDate,
    NDaysAgo,
    NMonthsAgo,
    NYearsAgo,
}

impl FormulaFunction {
    pub const ALL: [FormulaFunction; 10] = [
        FormulaFunction::Price,
        FormulaFunction::PricePercentChange,
        FormulaFunction::Stdev,
        FormulaFunction::MarketCap,
        FormulaFunction::PeRatio,
        FormulaFunction::PbRatio,
        FormulaFunction::AddDate,
        FormulaFunction::NDaysAgo,
        FormulaFunction::NMonthsAgo,
        FormulaFunction::NYearsAgo,
    ];

    /// Resolve a function by its formula name (case-sensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::PricePercentChange => "pricePercentChange",
            Self::Stdev => "stdev",
            Self::MarketCap => "marketCap",
            Self::PeRatio => "peRatio",
            Self::PbRatio => "pbRatio",
            Self::AddDate => "addDate",
            Self::NDaysAgo => "nDaysAgo",
            Self::NMonthsAgo => "nMonthsAgo",
            Self::NYearsAgo => "nYearsAgo",
        }
    }

    /// Exact number of arguments
    pub fn arity(&self) -> usize {
        match self {
            Self::Price | Self::MarketCap | Self::PeRatio | Self::PbRatio => 1,
            Self::PricePercentChange | Self::Stdev => 2,
            Self::AddDate => 4,
            Self::NDaysAgo | Self::NMonthsAgo | Self::NYearsAgo => 1,
        }
    }

    /// The provider capability behind a metric function, `None` for pure date helpers
    pub fn capability(&self) -> Option<MetricCapability> {
        match self {
            Self::Price => Some(MetricCapability::Price),
            Self::PricePercentChange => Some(MetricCapability::PricePercentChange),
            Self::Stdev => Some(MetricCapability::AnnualizedStdev),
            Self::MarketCap => Some(MetricCapability::MarketCap),
            Self::PeRatio => Some(MetricCapability::PeRatio),
            Self::PbRatio => Some(MetricCapability::PbRatio),
            Self::AddDate | Self::NDaysAgo | Self::NMonthsAgo | Self::NYearsAgo => None,
        }
    }
}

impl fmt::Display for FormulaFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
