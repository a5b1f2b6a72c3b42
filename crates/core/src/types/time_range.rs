use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use crate::error::CoreError;

const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

/// Caller-supplied calendar range; both days are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::InvalidTimeRange(format!("{start}~{end}")));
        }
        Ok(Self { start, end })
    }

    /// Reads the `from`/`to` request pair. Both must be present or both absent.
    pub fn from_params(from: Option<&str>, to: Option<&str>) -> Result<Option<Self>, CoreError> {
        let from = from.map(str::trim).filter(|value| !value.is_empty());
        let to = to.map(str::trim).filter(|value| !value.is_empty());
        match (from, to) {
            (None, None) => Ok(None),
            (Some(from), Some(to)) => Self::new(parse_date(from)?, parse_date(to)?).map(Some),
            (Some(from), None) => Err(CoreError::InvalidTimeRange(format!("{from}~"))),
            (None, Some(to)) => Err(CoreError::InvalidTimeRange(format!("~{to}"))),
        }
    }

    /// Midnight of `start` through the last microsecond of `end`. The end
    /// saturates at the latest representable instant.
    pub fn to_utc_bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.start.and_time(NaiveTime::MIN).and_utc();
        let end = self
            .end
            .and_time(NaiveTime::MIN)
            .and_utc()
            .checked_add_signed(Duration::days(1))
            .map(|next_day| next_day - Duration::microseconds(1))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        (start, end)
    }
}

/// Accepts four-digit years only.
fn parse_date(input: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .filter(|date| (MIN_YEAR..=MAX_YEAR).contains(&date.year()))
        .ok_or_else(|| CoreError::InvalidDate(input.to_string()))
}
