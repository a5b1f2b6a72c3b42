use async_trait::async_trait;
use backstage_core::domain::activity::ActivityEntry;
use backstage_core::domain::catalog::{ArticleSummary, ProductSummary, TrackSummary, UserSummary};
use backstage_core::domain::commerce::OrderSummary;
use backstage_core::error::DataAccessError;
use backstage_core::metrics::aggregate::{
    BucketedCount, BucketedSum, GroupAggregate, Grouping, Measure, MetricFilter, Ranking, Source,
};
use backstage_core::metrics::retention::{RetentionOffset, RetentionRow};
use backstage_core::store::{EntityLookup, MetricsStore};
use backstage_core::types::period::MetricWindow;
use uuid::Uuid;

use super::DbPool;
use super::metrics_repo::{self, MetricsRepoError};

/// Postgres-backed report store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn data_access(err: MetricsRepoError) -> DataAccessError {
    DataAccessError::new(err)
}

#[async_trait]
impl MetricsStore for PgStore {
    async fn count_in_window(
        &self,
        source: Source,
        window: Option<&MetricWindow>,
        filter: &MetricFilter,
    ) -> Result<i64, DataAccessError> {
        metrics_repo::count_in_window(&self.pool, source, window, filter)
            .await
            .map_err(data_access)
    }

    async fn sum_in_window(
        &self,
        measure: Measure,
        window: Option<&MetricWindow>,
        filter: &MetricFilter,
    ) -> Result<i64, DataAccessError> {
        metrics_repo::sum_in_window(&self.pool, measure, window, filter)
            .await
            .map_err(data_access)
    }

    async fn count_by_bucket(
        &self,
        source: Source,
        window: &MetricWindow,
        filter: &MetricFilter,
    ) -> Result<Vec<BucketedCount>, DataAccessError> {
        metrics_repo::count_by_bucket(&self.pool, source, window, filter)
            .await
            .map_err(data_access)
    }

    async fn sum_by_bucket(
        &self,
        measure: Measure,
        window: &MetricWindow,
        filter: &MetricFilter,
    ) -> Result<Vec<BucketedSum>, DataAccessError> {
        metrics_repo::sum_by_bucket(&self.pool, measure, window, filter)
            .await
            .map_err(data_access)
    }

    async fn count_active_users(&self, window: &MetricWindow) -> Result<i64, DataAccessError> {
        metrics_repo::count_active_users(&self.pool, window)
            .await
            .map_err(data_access)
    }

    async fn group_totals(
        &self,
        grouping: Grouping,
        window: Option<&MetricWindow>,
        filter: &MetricFilter,
        limit: i64,
    ) -> Result<Vec<GroupAggregate<String>>, DataAccessError> {
        metrics_repo::group_totals(&self.pool, grouping, window, filter, limit)
            .await
            .map_err(data_access)
    }

    async fn rank(
        &self,
        ranking: Ranking,
        window: &MetricWindow,
        n: i64,
    ) -> Result<Vec<GroupAggregate<Uuid>>, DataAccessError> {
        metrics_repo::rank(&self.pool, ranking, window, n)
            .await
            .map_err(data_access)
    }

    async fn cohort_retention(
        &self,
        window: &MetricWindow,
        offset: RetentionOffset,
    ) -> Result<Vec<RetentionRow>, DataAccessError> {
        metrics_repo::cohort_retention(&self.pool, window, offset)
            .await
            .map_err(data_access)
    }

    async fn recent_orders(&self, limit: i64) -> Result<Vec<OrderSummary>, DataAccessError> {
        metrics_repo::recent_orders(&self.pool, limit)
            .await
            .map_err(data_access)
    }

    async fn recent_activity(&self, limit: i64) -> Result<Vec<ActivityEntry>, DataAccessError> {
        metrics_repo::recent_activity(&self.pool, limit)
            .await
            .map_err(data_access)
    }
}

#[async_trait]
impl EntityLookup<TrackSummary> for PgStore {
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<TrackSummary>, DataAccessError> {
        metrics_repo::find_tracks(&self.pool, ids)
            .await
            .map_err(data_access)
    }
}

#[async_trait]
impl EntityLookup<ArticleSummary> for PgStore {
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ArticleSummary>, DataAccessError> {
        metrics_repo::find_articles(&self.pool, ids)
            .await
            .map_err(data_access)
    }
}

#[async_trait]
impl EntityLookup<ProductSummary> for PgStore {
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ProductSummary>, DataAccessError> {
        metrics_repo::find_products(&self.pool, ids)
            .await
            .map_err(data_access)
    }
}

#[async_trait]
impl EntityLookup<UserSummary> for PgStore {
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserSummary>, DataAccessError> {
        metrics_repo::find_users(&self.pool, ids)
            .await
            .map_err(data_access)
    }
}
