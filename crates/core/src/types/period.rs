use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Months, Utc};
use serde::Serialize;

use crate::error::CoreError;
use crate::types::time_range::DateRange;

/// Symbolic reporting period accepted from callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

/// Period recorded on a resolved window. `Custom` marks a caller range
/// that arrived without a symbolic period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Day,
    Week,
    Month,
    Year,
    Custom,
}

impl Period {
    pub const DEFAULT: Period = Period::Month;

    /// Start of the period ending at `now`.
    ///
    /// Month and year steps use calendar arithmetic and clamp to the last
    /// valid day of the target month (Mar 31 minus one month is Feb 28/29).
    pub fn start_before(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Period::Day => now - Duration::days(1),
            Period::Week => now - Duration::days(7),
            Period::Month => sub_months(now, 1),
            Period::Year => sub_months(now, 12),
        }
    }
}

impl FromStr for Period {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            _ => Err(CoreError::InvalidPeriod(value.to_string())),
        }
    }
}

impl From<Period> for PeriodKind {
    fn from(period: Period) -> Self {
        match period {
            Period::Day => PeriodKind::Day,
            Period::Week => PeriodKind::Week,
            Period::Month => PeriodKind::Month,
            Period::Year => PeriodKind::Year,
        }
    }
}

impl PeriodKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PeriodKind::Day => "day",
            PeriodKind::Week => "week",
            PeriodKind::Month => "month",
            PeriodKind::Year => "year",
            PeriodKind::Custom => "custom",
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete `[start, end]` window a report is computed over. Inclusive at
/// both ends; `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub period: PeriodKind,
}

impl MetricWindow {
    /// An explicit range wins over the symbolic period for the bounds; the
    /// period, when given, is still recorded on the window.
    pub fn resolve(
        period: Option<Period>,
        explicit: Option<DateRange>,
        now: DateTime<Utc>,
    ) -> Self {
        match explicit {
            Some(range) => {
                let (start, end) = range.to_utc_bounds();
                Self {
                    start,
                    end,
                    period: period.map(PeriodKind::from).unwrap_or(PeriodKind::Custom),
                }
            }
            None => Self::for_period(period.unwrap_or(Period::DEFAULT), now),
        }
    }

    pub fn for_period(period: Period, now: DateTime<Utc>) -> Self {
        Self {
            start: period.start_before(now),
            end: now,
            period: period.into(),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

fn sub_months(now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
