//! Read-only boundary between the report engine and whatever holds the data.
//!
//! Every method is a single pure read. Implementations surface failures as
//! [`DataAccessError`] and never retry.

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::activity::ActivityEntry;
use crate::domain::catalog::{ArticleSummary, ProductSummary, TrackSummary, UserSummary};
use crate::domain::commerce::OrderSummary;
use crate::error::DataAccessError;
use crate::metrics::aggregate::{
    BucketedCount, BucketedSum, GroupAggregate, Grouping, Measure, MetricFilter, Ranking, Source,
};
use crate::metrics::retention::{RetentionOffset, RetentionRow};
use crate::types::period::MetricWindow;

#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Rows of `source` inside `window` (all time when `None`).
    async fn count_in_window(
        &self,
        source: Source,
        window: Option<&MetricWindow>,
        filter: &MetricFilter,
    ) -> Result<i64, DataAccessError>;

    async fn sum_in_window(
        &self,
        measure: Measure,
        window: Option<&MetricWindow>,
        filter: &MetricFilter,
    ) -> Result<i64, DataAccessError>;

    /// Day buckets (UTC) ascending. Days without rows are absent.
    async fn count_by_bucket(
        &self,
        source: Source,
        window: &MetricWindow,
        filter: &MetricFilter,
    ) -> Result<Vec<BucketedCount>, DataAccessError>;

    async fn sum_by_bucket(
        &self,
        measure: Measure,
        window: &MetricWindow,
        filter: &MetricFilter,
    ) -> Result<Vec<BucketedSum>, DataAccessError>;

    /// Distinct users with a playback or a page view inside the window.
    async fn count_active_users(&self, window: &MetricWindow) -> Result<i64, DataAccessError>;

    async fn group_totals(
        &self,
        grouping: Grouping,
        window: Option<&MetricWindow>,
        filter: &MetricFilter,
        limit: i64,
    ) -> Result<Vec<GroupAggregate<String>>, DataAccessError>;

    /// Top `n` keys by value descending, ties broken by ascending id.
    async fn rank(
        &self,
        ranking: Ranking,
        window: &MetricWindow,
        n: i64,
    ) -> Result<Vec<GroupAggregate<Uuid>>, DataAccessError>;

    /// Cohorts of users by signup day within the window. A user counts as
    /// retained when any activity happened strictly later than their own
    /// signup plus `offset`.
    async fn cohort_retention(
        &self,
        window: &MetricWindow,
        offset: RetentionOffset,
    ) -> Result<Vec<RetentionRow>, DataAccessError>;

    /// Newest orders first.
    async fn recent_orders(&self, limit: i64) -> Result<Vec<OrderSummary>, DataAccessError>;

    /// Newest signups, orders, posts and comments interleaved by time.
    async fn recent_activity(&self, limit: i64) -> Result<Vec<ActivityEntry>, DataAccessError>;
}

/// Batched detail lookup used for join-back. Ids that no longer resolve are
/// simply missing from the result.
#[async_trait]
pub trait EntityLookup<T>: Send + Sync {
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<T>, DataAccessError>;
}

/// Everything the report assemblers need from a store.
pub trait ReportStore:
    MetricsStore
    + EntityLookup<TrackSummary>
    + EntityLookup<ArticleSummary>
    + EntityLookup<ProductSummary>
    + EntityLookup<UserSummary>
{
}

impl<S> ReportStore for S where
    S: MetricsStore
        + EntityLookup<TrackSummary>
        + EntityLookup<ArticleSummary>
        + EntityLookup<ProductSummary>
        + EntityLookup<UserSummary>
        + ?Sized
{
}
