use serde::Serialize;

use crate::domain::commerce::OrderStatus;
use crate::error::DataAccessError;
use crate::metrics::aggregate::{AggregateMetric, Measure, MetricFilter, Source, aggregate_metric};
use crate::store::MetricsStore;
use crate::types::period::MetricWindow;

#[derive(Debug, Clone, Serialize)]
pub struct OverviewReport {
    pub range: MetricWindow,
    pub users: AggregateMetric,
    pub content: ContentTotals,
    pub engagement: Engagement,
    pub revenue: RevenueTotals,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentTotals {
    pub tracks: AggregateMetric,
    pub articles: AggregateMetric,
    pub posts: AggregateMetric,
}

#[derive(Debug, Clone, Serialize)]
pub struct Engagement {
    pub playbacks: AggregateMetric,
    /// Seconds listened inside the window.
    pub listening_secs: i64,
    pub page_views: AggregateMetric,
    pub comments: AggregateMetric,
    pub active_users: i64,
}

/// Paid orders only; amounts are integer cents.
#[derive(Debug, Clone, Serialize)]
pub struct RevenueTotals {
    pub total: i64,
    pub period: i64,
    pub period_share: f64,
    pub orders: AggregateMetric,
}

pub async fn overview<S>(
    store: &S,
    window: &MetricWindow,
) -> Result<OverviewReport, DataAccessError>
where
    S: MetricsStore + ?Sized,
{
    let none = MetricFilter::none();
    let paid = MetricFilter::status(OrderStatus::Paid);

    let (
        users,
        tracks,
        articles,
        posts,
        playbacks,
        listening_secs,
        page_views,
        comments,
        active_users,
        revenue_total,
        revenue_period,
        orders,
    ) = tokio::try_join!(
        aggregate_metric(store, Source::Users, window, &none),
        aggregate_metric(store, Source::Tracks, window, &none),
        aggregate_metric(store, Source::Articles, window, &none),
        aggregate_metric(store, Source::Posts, window, &none),
        aggregate_metric(store, Source::Playbacks, window, &none),
        store.sum_in_window(Measure::ListeningSeconds, Some(window), &none),
        aggregate_metric(store, Source::PageViews, window, &none),
        aggregate_metric(store, Source::Comments, window, &none),
        store.count_active_users(window),
        store.sum_in_window(Measure::OrderRevenue, None, &paid),
        store.sum_in_window(Measure::OrderRevenue, Some(window), &paid),
        aggregate_metric(store, Source::Orders, window, &paid),
    )?;

    let revenue_share = AggregateMetric::new(revenue_total, revenue_period).period_share;
    Ok(OverviewReport {
        range: *window,
        users,
        content: ContentTotals {
            tracks,
            articles,
            posts,
        },
        engagement: Engagement {
            playbacks,
            listening_secs,
            page_views,
            comments,
            active_users,
        },
        revenue: RevenueTotals {
            total: revenue_total,
            period: revenue_period,
            period_share: revenue_share,
            orders,
        },
    })
}
