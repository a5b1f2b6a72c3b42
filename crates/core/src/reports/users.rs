use serde::Serialize;

use crate::error::DataAccessError;
use crate::metrics::aggregate::{BucketedCount, GroupAggregate, Grouping, MetricFilter, Source};
use crate::metrics::retention::{RetentionEntry, RetentionOffset, cohort_retention};
use crate::store::MetricsStore;
use crate::types::period::MetricWindow;

use super::ROLE_LIMIT;

#[derive(Debug, Clone, Serialize)]
pub struct UserAnalytics {
    pub range: MetricWindow,
    pub signups: Vec<BucketedCount>,
    /// All users by role, not limited to the window.
    pub roles: Vec<GroupAggregate<String>>,
    pub active_users: i64,
    pub retention: Vec<RetentionEntry>,
}

pub async fn user_analytics<S>(
    store: &S,
    window: &MetricWindow,
    offset: RetentionOffset,
) -> Result<UserAnalytics, DataAccessError>
where
    S: MetricsStore + ?Sized,
{
    let none = MetricFilter::none();
    let (signups, roles, active_users, retention) = tokio::try_join!(
        store.count_by_bucket(Source::Users, window, &none),
        store.group_totals(Grouping::UserRole, None, &none, ROLE_LIMIT),
        store.count_active_users(window),
        cohort_retention(store, window, offset),
    )?;

    Ok(UserAnalytics {
        range: *window,
        signups,
        roles,
        active_users,
        retention,
    })
}
