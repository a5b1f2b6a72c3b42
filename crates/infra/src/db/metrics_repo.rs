//! Aggregate reads behind [`backstage_core::store::MetricsStore`].
//!
//! Dynamic statements are assembled with `QueryBuilder`; every identifier
//! pushed as raw SQL comes from the static tables below, every value is a
//! bind parameter.

use std::str::FromStr;

use backstage_core::domain::activity::{ActivityEntry, ActivityKind};
use backstage_core::domain::catalog::{ArticleSummary, ProductSummary, TrackSummary, UserSummary};
use backstage_core::domain::commerce::{OrderStatus, OrderSummary};
use backstage_core::metrics::aggregate::{
    BucketedCount, BucketedSum, GroupAggregate, Grouping, Measure, MetricFilter, Ranking, Source,
};
use backstage_core::metrics::retention::{RetentionOffset, RetentionRow};
use backstage_core::types::period::MetricWindow;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MetricsRepoError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("filter {column} does not apply to {target:?}")]
    UnsupportedFilter { column: &'static str, target: Source },
    #[error("unexpected {column} value: {value}")]
    Decode { column: &'static str, value: String },
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct BucketRecord {
    bucket: NaiveDate,
    count: i64,
    total: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct LabelTotal {
    group_key: String,
    total: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct EntityTotal {
    entity_id: Uuid,
    total: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct CohortRecord {
    cohort_date: NaiveDate,
    total_users: i64,
    retained_users: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct OrderRecord {
    id: Uuid,
    user_id: Uuid,
    status: String,
    total_cents: i64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ActivityRecord {
    kind: String,
    entity_id: Uuid,
    actor_id: Uuid,
    occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct TrackRecord {
    id: Uuid,
    title: String,
    artist_name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ArticleRecord {
    id: Uuid,
    title: String,
    slug: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ProductRecord {
    id: Uuid,
    name: String,
    product_type: String,
    price_cents: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    role: String,
}

/// Table and timestamp column a source is windowed on.
fn table_of(source: Source) -> (&'static str, &'static str) {
    match source {
        Source::Users => ("users", "created_at"),
        Source::Tracks => ("tracks", "created_at"),
        Source::Articles => ("articles", "created_at"),
        Source::Orders => ("orders", "created_at"),
        Source::Playbacks => ("playbacks", "played_at"),
        Source::PageViews => ("page_views", "viewed_at"),
        Source::Posts => ("posts", "created_at"),
        Source::Comments => ("comments", "created_at"),
    }
}

fn measure_column(measure: Measure) -> &'static str {
    match measure {
        Measure::OrderRevenue => "total_cents",
        Measure::ListeningSeconds => "duration_secs",
    }
}

/// `LIKE` pattern matching `prefix` literally at the start of the value.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn push_window(
    builder: &mut QueryBuilder<'static, Postgres>,
    column: &str,
    window: Option<&MetricWindow>,
) {
    if let Some(window) = window {
        builder
            .push(" AND ")
            .push(column)
            .push(" >= ")
            .push_bind(window.start)
            .push(" AND ")
            .push(column)
            .push(" <= ")
            .push_bind(window.end);
    }
}

fn push_filter(
    builder: &mut QueryBuilder<'static, Postgres>,
    source: Source,
    filter: &MetricFilter,
    qualifier: &str,
) -> Result<(), MetricsRepoError> {
    if let Some(column) = filter.unsupported_by(source) {
        return Err(MetricsRepoError::UnsupportedFilter {
            column,
            target: source,
        });
    }
    if let Some(status) = filter.order_status {
        builder
            .push(" AND ")
            .push(qualifier)
            .push("status = ")
            .push_bind(status.as_str());
    }
    if let Some(prefix) = filter.path_prefix.as_deref() {
        builder
            .push(" AND ")
            .push(qualifier)
            .push("path LIKE ")
            .push_bind(like_prefix(prefix))
            .push(r" ESCAPE '\'");
    }
    Ok(())
}

fn count_query(
    source: Source,
    window: Option<&MetricWindow>,
    filter: &MetricFilter,
) -> Result<QueryBuilder<'static, Postgres>, MetricsRepoError> {
    let (table, ts) = table_of(source);
    let mut builder =
        QueryBuilder::new(format!("SELECT COUNT(*)::bigint FROM {table} WHERE TRUE"));
    push_window(&mut builder, ts, window);
    push_filter(&mut builder, source, filter, "")?;
    Ok(builder)
}

fn sum_query(
    measure: Measure,
    window: Option<&MetricWindow>,
    filter: &MetricFilter,
) -> Result<QueryBuilder<'static, Postgres>, MetricsRepoError> {
    let source = measure.source();
    let (table, ts) = table_of(source);
    let column = measure_column(measure);
    let mut builder = QueryBuilder::new(format!(
        "SELECT COALESCE(SUM({column}), 0)::bigint FROM {table} WHERE TRUE"
    ));
    push_window(&mut builder, ts, window);
    push_filter(&mut builder, source, filter, "")?;
    Ok(builder)
}

/// Day buckets in UTC. Without a measure `total` is always zero.
fn bucket_query(
    source: Source,
    measure: Option<Measure>,
    window: &MetricWindow,
    filter: &MetricFilter,
) -> Result<QueryBuilder<'static, Postgres>, MetricsRepoError> {
    let (table, ts) = table_of(source);
    let total = match measure {
        Some(measure) => format!("COALESCE(SUM({}), 0)::bigint", measure_column(measure)),
        None => "0::bigint".to_string(),
    };
    let mut builder = QueryBuilder::new(format!(
        "SELECT ({ts} AT TIME ZONE 'UTC')::date AS bucket, COUNT(*)::bigint AS count, \
         {total} AS total FROM {table} WHERE TRUE"
    ));
    push_window(&mut builder, ts, Some(window));
    push_filter(&mut builder, source, filter, "")?;
    builder.push(" GROUP BY bucket ORDER BY bucket");
    Ok(builder)
}

fn group_query(
    grouping: Grouping,
    window: Option<&MetricWindow>,
    filter: &MetricFilter,
    limit: i64,
) -> Result<QueryBuilder<'static, Postgres>, MetricsRepoError> {
    let (select, ts, qualifier) = match grouping {
        Grouping::UserRole => (
            "SELECT role AS group_key, COUNT(*)::bigint AS total FROM users WHERE TRUE",
            "created_at",
            "",
        ),
        Grouping::PagePath => (
            "SELECT path AS group_key, COUNT(*)::bigint AS total FROM page_views WHERE TRUE",
            "viewed_at",
            "",
        ),
        Grouping::Referrer => (
            "SELECT COALESCE(NULLIF(referrer, ''), 'direct') AS group_key, \
             COUNT(*)::bigint AS total FROM page_views WHERE TRUE",
            "viewed_at",
            "",
        ),
        Grouping::ProductTypeRevenue => (
            "SELECT p.product_type AS group_key, \
             COALESCE(SUM(oi.quantity * oi.unit_price_cents), 0)::bigint AS total \
             FROM order_items oi \
             JOIN orders o ON o.id = oi.order_id \
             JOIN products p ON p.id = oi.product_id \
             WHERE TRUE",
            "o.created_at",
            "o.",
        ),
    };
    let mut builder = QueryBuilder::new(select);
    push_window(&mut builder, ts, window);
    push_filter(&mut builder, grouping.source(), filter, qualifier)?;
    builder
        .push(" GROUP BY group_key ORDER BY total DESC, group_key ASC LIMIT ")
        .push_bind(limit);
    Ok(builder)
}

fn rank_query(ranking: Ranking, window: &MetricWindow, n: i64) -> QueryBuilder<'static, Postgres> {
    let mut builder = match ranking {
        Ranking::TrackPlays => {
            let mut builder = QueryBuilder::new(
                "SELECT track_id AS entity_id, COUNT(*)::bigint AS total FROM playbacks WHERE TRUE",
            );
            push_window(&mut builder, "played_at", Some(window));
            builder
        }
        Ranking::ArticleViews => {
            let mut builder = QueryBuilder::new(
                "SELECT article_id AS entity_id, COUNT(*)::bigint AS total \
                 FROM page_views WHERE article_id IS NOT NULL",
            );
            push_window(&mut builder, "viewed_at", Some(window));
            builder
        }
        Ranking::ProductUnitsSold => {
            let mut builder = QueryBuilder::new(
                "SELECT oi.product_id AS entity_id, COALESCE(SUM(oi.quantity), 0)::bigint AS total \
                 FROM order_items oi JOIN orders o ON o.id = oi.order_id WHERE o.status = ",
            );
            builder.push_bind(OrderStatus::Paid.as_str());
            push_window(&mut builder, "o.created_at", Some(window));
            builder
        }
    };
    builder
        .push(" GROUP BY entity_id ORDER BY total DESC, entity_id ASC LIMIT ")
        .push_bind(n);
    builder
}

pub async fn count_in_window(
    pool: &PgPool,
    source: Source,
    window: Option<&MetricWindow>,
    filter: &MetricFilter,
) -> Result<i64, MetricsRepoError> {
    let mut builder = count_query(source, window, filter)?;
    let count = builder.build_query_scalar::<i64>().fetch_one(pool).await?;
    Ok(count)
}

pub async fn sum_in_window(
    pool: &PgPool,
    measure: Measure,
    window: Option<&MetricWindow>,
    filter: &MetricFilter,
) -> Result<i64, MetricsRepoError> {
    let mut builder = sum_query(measure, window, filter)?;
    let total = builder.build_query_scalar::<i64>().fetch_one(pool).await?;
    Ok(total)
}

pub async fn count_by_bucket(
    pool: &PgPool,
    source: Source,
    window: &MetricWindow,
    filter: &MetricFilter,
) -> Result<Vec<BucketedCount>, MetricsRepoError> {
    let mut builder = bucket_query(source, None, window, filter)?;
    let rows = builder.build_query_as::<BucketRecord>().fetch_all(pool).await?;
    Ok(rows
        .into_iter()
        .map(|row| BucketedCount {
            bucket: row.bucket,
            count: row.count,
        })
        .collect())
}

pub async fn sum_by_bucket(
    pool: &PgPool,
    measure: Measure,
    window: &MetricWindow,
    filter: &MetricFilter,
) -> Result<Vec<BucketedSum>, MetricsRepoError> {
    let mut builder = bucket_query(measure.source(), Some(measure), window, filter)?;
    let rows = builder.build_query_as::<BucketRecord>().fetch_all(pool).await?;
    Ok(rows
        .into_iter()
        .map(|row| BucketedSum {
            bucket: row.bucket,
            count: row.count,
            total: row.total,
        })
        .collect())
}

pub async fn count_active_users(
    pool: &PgPool,
    window: &MetricWindow,
) -> Result<i64, MetricsRepoError> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(DISTINCT user_id)::bigint
        FROM (
            SELECT user_id FROM playbacks
            WHERE user_id IS NOT NULL AND played_at >= $1 AND played_at <= $2
            UNION ALL
            SELECT user_id FROM page_views
            WHERE user_id IS NOT NULL AND viewed_at >= $1 AND viewed_at <= $2
        ) active
        "#,
    )
    .bind(window.start)
    .bind(window.end)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn group_totals(
    pool: &PgPool,
    grouping: Grouping,
    window: Option<&MetricWindow>,
    filter: &MetricFilter,
    limit: i64,
) -> Result<Vec<GroupAggregate<String>>, MetricsRepoError> {
    let mut builder = group_query(grouping, window, filter, limit)?;
    let rows = builder.build_query_as::<LabelTotal>().fetch_all(pool).await?;
    Ok(rows
        .into_iter()
        .map(|row| GroupAggregate {
            key: row.group_key,
            value: row.total,
        })
        .collect())
}

pub async fn rank(
    pool: &PgPool,
    ranking: Ranking,
    window: &MetricWindow,
    n: i64,
) -> Result<Vec<GroupAggregate<Uuid>>, MetricsRepoError> {
    let mut builder = rank_query(ranking, window, n);
    let rows = builder.build_query_as::<EntityTotal>().fetch_all(pool).await?;
    Ok(rows
        .into_iter()
        .map(|row| GroupAggregate {
            key: row.entity_id,
            value: row.total,
        })
        .collect())
}

/// Retained means a playback or page view strictly later than the user's
/// own signup plus the offset; cohort buckets only group the counts.
pub async fn cohort_retention(
    pool: &PgPool,
    window: &MetricWindow,
    offset: RetentionOffset,
) -> Result<Vec<RetentionRow>, MetricsRepoError> {
    let days = i32::try_from(offset.as_days()).unwrap_or(i32::MAX);
    let rows = sqlx::query_as::<_, CohortRecord>(
        r#"
        SELECT
            (u.created_at AT TIME ZONE 'UTC')::date AS cohort_date,
            COUNT(*)::bigint AS total_users,
            COUNT(*) FILTER (
                WHERE EXISTS (
                    SELECT 1 FROM playbacks p
                    WHERE p.user_id = u.id
                      AND p.played_at > u.created_at + make_interval(days => $3)
                )
                OR EXISTS (
                    SELECT 1 FROM page_views v
                    WHERE v.user_id = u.id
                      AND v.viewed_at > u.created_at + make_interval(days => $3)
                )
            )::bigint AS retained_users
        FROM users u
        WHERE u.created_at >= $1 AND u.created_at <= $2
        GROUP BY cohort_date
        ORDER BY cohort_date
        "#,
    )
    .bind(window.start)
    .bind(window.end)
    .bind(days)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|row| RetentionRow {
            cohort_date: row.cohort_date,
            total_users: row.total_users,
            retained_users: row.retained_users,
        })
        .collect())
}

pub async fn recent_orders(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<OrderSummary>, MetricsRepoError> {
    let rows = sqlx::query_as::<_, OrderRecord>(
        r#"
        SELECT id, user_id, status, total_cents, created_at
        FROM orders
        ORDER BY created_at DESC, id DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(map_order).collect()
}

pub async fn recent_activity(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<ActivityEntry>, MetricsRepoError> {
    let rows = sqlx::query_as::<_, ActivityRecord>(
        r#"
        SELECT kind, entity_id, actor_id, occurred_at
        FROM (
            (SELECT 'signup'::text AS kind, id AS entity_id, id AS actor_id, created_at AS occurred_at
             FROM users ORDER BY created_at DESC, id DESC LIMIT $1)
            UNION ALL
            (SELECT 'order'::text, id, user_id, created_at
             FROM orders ORDER BY created_at DESC, id DESC LIMIT $1)
            UNION ALL
            (SELECT 'post'::text, id, author_id, created_at
             FROM posts ORDER BY created_at DESC, id DESC LIMIT $1)
            UNION ALL
            (SELECT 'comment'::text, id, author_id, created_at
             FROM comments ORDER BY created_at DESC, id DESC LIMIT $1)
        ) feed
        ORDER BY occurred_at DESC, entity_id DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|row| {
            let kind = ActivityKind::from_str(&row.kind).map_err(|_| MetricsRepoError::Decode {
                column: "kind",
                value: row.kind.clone(),
            })?;
            Ok(ActivityEntry {
                kind,
                entity_id: row.entity_id,
                actor_id: row.actor_id,
                occurred_at: row.occurred_at,
            })
        })
        .collect()
}

pub async fn find_tracks(
    pool: &PgPool,
    ids: &[Uuid],
) -> Result<Vec<TrackSummary>, MetricsRepoError> {
    let rows = sqlx::query_as::<_, TrackRecord>(
        r#"
        SELECT id, title, artist_name
        FROM tracks
        WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|row| TrackSummary {
            id: row.id,
            title: row.title,
            artist_name: row.artist_name,
        })
        .collect())
}

pub async fn find_articles(
    pool: &PgPool,
    ids: &[Uuid],
) -> Result<Vec<ArticleSummary>, MetricsRepoError> {
    let rows = sqlx::query_as::<_, ArticleRecord>(
        r#"
        SELECT id, title, slug
        FROM articles
        WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|row| ArticleSummary {
            id: row.id,
            title: row.title,
            slug: row.slug,
        })
        .collect())
}

pub async fn find_products(
    pool: &PgPool,
    ids: &[Uuid],
) -> Result<Vec<ProductSummary>, MetricsRepoError> {
    let rows = sqlx::query_as::<_, ProductRecord>(
        r#"
        SELECT id, name, product_type, price_cents
        FROM products
        WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|row| ProductSummary {
            id: row.id,
            name: row.name,
            product_type: row.product_type,
            price_cents: row.price_cents,
        })
        .collect())
}

pub async fn find_users(
    pool: &PgPool,
    ids: &[Uuid],
) -> Result<Vec<UserSummary>, MetricsRepoError> {
    let rows = sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, name, role
        FROM users
        WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|row| UserSummary {
            id: row.id,
            name: row.name,
            role: row.role,
        })
        .collect())
}

fn map_order(row: OrderRecord) -> Result<OrderSummary, MetricsRepoError> {
    let status = OrderStatus::from_str(&row.status).map_err(|_| MetricsRepoError::Decode {
        column: "status",
        value: row.status.clone(),
    })?;
    Ok(OrderSummary {
        id: row.id,
        user_id: row.user_id,
        status,
        total_cents: row.total_cents,
        created_at: row.created_at,
    })
}
