use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::error::{CoreError, DataAccessError};
use crate::metrics::rate::percentage;
use crate::store::MetricsStore;
use crate::types::period::MetricWindow;

/// Minimum gap after a user's own signup before an activity counts as
/// retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionOffset(i64);

impl RetentionOffset {
    pub const MAX_DAYS: i64 = 365;

    pub fn days(days: i64) -> Result<Self, CoreError> {
        if !(0..=Self::MAX_DAYS).contains(&days) {
            return Err(CoreError::InvalidRetentionOffset {
                value: days,
                max: Self::MAX_DAYS,
            });
        }
        Ok(Self(days))
    }

    pub fn as_days(self) -> i64 {
        self.0
    }

    /// Evaluated per user, never per cohort bucket.
    pub fn is_retained(self, signed_up_at: DateTime<Utc>, activity_at: DateTime<Utc>) -> bool {
        activity_at > signed_up_at + Duration::days(self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetentionRow {
    pub cohort_date: NaiveDate,
    pub total_users: i64,
    pub retained_users: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionEntry {
    pub cohort_date: NaiveDate,
    pub total_users: i64,
    pub retained_users: i64,
    pub retention_rate: f64,
}

impl From<RetentionRow> for RetentionEntry {
    fn from(row: RetentionRow) -> Self {
        Self {
            retention_rate: percentage(row.retained_users, row.total_users),
            cohort_date: row.cohort_date,
            total_users: row.total_users,
            retained_users: row.retained_users,
        }
    }
}

/// Cohort rows ascending by date. A row claiming more retained users than
/// members fails the whole call.
pub async fn cohort_retention<S>(
    store: &S,
    window: &MetricWindow,
    offset: RetentionOffset,
) -> Result<Vec<RetentionEntry>, DataAccessError>
where
    S: MetricsStore + ?Sized,
{
    let mut rows = store.cohort_retention(window, offset).await?;
    rows.sort_by_key(|row| row.cohort_date);
    if let Some(row) = rows
        .iter()
        .find(|row| row.retained_users > row.total_users || row.retained_users < 0)
    {
        return Err(DataAccessError::new(format!(
            "cohort {} reports {} retained of {} users",
            row.cohort_date, row.retained_users, row.total_users
        )));
    }
    Ok(rows.into_iter().map(RetentionEntry::from).collect())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::types::period::Period;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, d, h, 0, 0).unwrap()
    }

    #[test]
    fn offset_bounds() {
        assert!(RetentionOffset::days(0).is_ok());
        assert!(RetentionOffset::days(365).is_ok());
        assert!(RetentionOffset::days(-1).is_err());
        assert!(RetentionOffset::days(366).is_err());
    }

    #[test]
    fn retained_requires_strictly_later_activity() {
        let offset = RetentionOffset::days(1).unwrap();
        assert!(!offset.is_retained(at(1, 10), at(2, 10)));
        assert!(offset.is_retained(at(1, 10), at(2, 11)));
    }

    #[tokio::test]
    async fn retention_is_measured_from_each_users_signup() {
        let mut store = MemoryStore::default();
        // Same cohort day, different signup hours.
        store.add_user(1, "early", "member", at(1, 0));
        store.add_user(2, "late", "member", at(1, 23));
        store.add_page_view("/", None, Some(1), None, at(2, 1));
        store.add_page_view("/", None, Some(2), None, at(2, 22));
        let window = MetricWindow::for_period(Period::Month, at(20, 0));

        let rows = cohort_retention(&store, &window, RetentionOffset::days(1).unwrap())
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cohort_date, at(1, 0).date_naive());
        assert_eq!(rows[0].total_users, 2);
        assert_eq!(rows[0].retained_users, 1);
        assert_eq!(rows[0].retention_rate, 50.0);
    }

    #[tokio::test]
    async fn retained_never_exceeds_cohort_size() {
        let mut store = MemoryStore::default();
        for (n, day) in [(1, 1), (2, 1), (3, 2), (4, 3), (5, 3)] {
            store.add_user(n, "u", "member", at(day, 8));
            store.add_playback(100, Some(n), 60, at(day + 5, 8));
            store.add_playback(100, Some(n), 60, at(day + 6, 8));
        }
        let window = MetricWindow::for_period(Period::Month, at(25, 0));

        let rows = cohort_retention(&store, &window, RetentionOffset::days(2).unwrap())
            .await
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.retained_users <= row.total_users));
        let dates: Vec<NaiveDate> = rows.iter().map(|row| row.cohort_date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
    }
}
