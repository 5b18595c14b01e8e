use chrono::{Datelike, NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Symbol identifier for an asset in the universe
pub type Symbol = String;

/// Point-in-time date a metric is observed on
pub type MetricDate = NaiveDate;

/// Date layout used on the formula surface (`YYYY-MM-DD`)
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Format a date the way formulas see it
pub fn format_iso_date(date: MetricDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

/// Parse an ISO date argument, `None` if malformed
pub fn parse_iso_date(value: &str) -> Option<MetricDate> {
    NaiveDate::parse_from_str(value.trim(), ISO_DATE_FORMAT).ok()
}

/// Calendar arithmetic with overflow normalization.
///
/// Years and months are applied first; an out-of-range day of month rolls
/// into the following month (2021-01-31 + 1 month = 2021-03-03). Days are
/// applied last. Returns `None` if the result leaves the representable range.
pub fn add_calendar(date: MetricDate, years: i64, months: i64, days: i64) -> Option<MetricDate> {
    let total_months = i64::from(date.year())
        .checked_mul(12)?
        .checked_add(i64::from(date.month0()))?
        .checked_add(years.checked_mul(12)?)?
        .checked_add(months)?;

    let year = i32::try_from(total_months.div_euclid(12)).ok()?;
    let month = u32::try_from(total_months.rem_euclid(12)).ok()? + 1;
    let first_of_month = NaiveDate::from_ymd_opt(year, month, 1)?;

    let offset = i64::from(date.day0()).checked_add(days)?;
    first_of_month.checked_add_signed(TimeDelta::try_days(offset)?)
}

/// How much of the maximum feasible tilt to apply, in (0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct FactorIntensity(f64);

impl FactorIntensity {
    /// Full tilt
    pub const FULL: FactorIntensity = FactorIntensity(1.0);

    pub fn new(value: f64) -> DomainResult<Self> {
        if value.is_nan() || value <= 0.0 || value > 1.0 {
            return Err(DomainError::InvalidIntensity(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for FactorIntensity {
    fn default() -> Self {
        Self::FULL
    }
}

impl TryFrom<f64> for FactorIntensity {
    type Error = DomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FactorIntensity> for f64 {
    fn from(intensity: FactorIntensity) -> Self {
        intensity.0
    }
}
