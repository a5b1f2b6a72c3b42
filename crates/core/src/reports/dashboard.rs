use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::activity::ActivityEntry;
use crate::domain::catalog::{TrackSummary, UserSummary};
use crate::domain::commerce::OrderSummary;
use crate::error::DataAccessError;
use crate::metrics::aggregate::Ranking;
use crate::metrics::ranking::{RankedItem, top_n};
use crate::store::{EntityLookup, ReportStore};
use crate::types::period::{MetricWindow, Period};

use super::overview::{OverviewReport, overview};

const RECENT_ORDERS: i64 = 10;
const POPULAR_CONTENT: i64 = 5;
const RECENT_ACTIVITY: i64 = 20;

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub metrics: OverviewReport,
    pub recent_orders: Vec<RecentOrder>,
    pub popular_content: Vec<RankedItem<TrackSummary>>,
    pub recent_activity: Vec<ActivityEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentOrder {
    #[serde(flatten)]
    pub order: OrderSummary,
    pub customer: Option<UserSummary>,
}

/// Month-to-date metrics plus the week's most played tracks.
pub async fn dashboard<S>(store: &S, now: DateTime<Utc>) -> Result<Dashboard, DataAccessError>
where
    S: ReportStore + ?Sized,
{
    let month = MetricWindow::for_period(Period::Month, now);
    let week = MetricWindow::for_period(Period::Week, now);

    let (metrics, recent_orders, popular_content, recent_activity) = tokio::try_join!(
        overview(store, &month),
        recent_orders(store),
        top_n::<TrackSummary, S>(store, Ranking::TrackPlays, &week, POPULAR_CONTENT),
        store.recent_activity(RECENT_ACTIVITY),
    )?;

    Ok(Dashboard {
        metrics,
        recent_orders,
        popular_content,
        recent_activity,
    })
}

async fn recent_orders<S>(store: &S) -> Result<Vec<RecentOrder>, DataAccessError>
where
    S: ReportStore + ?Sized,
{
    let orders = store.recent_orders(RECENT_ORDERS).await?;
    if orders.is_empty() {
        return Ok(Vec::new());
    }
    let mut customer_ids: Vec<_> = orders.iter().map(|order| order.user_id).collect();
    customer_ids.sort();
    customer_ids.dedup();
    let customers = <S as EntityLookup<UserSummary>>::find_by_ids(store, &customer_ids).await?;

    Ok(orders
        .into_iter()
        .map(|order| {
            let customer = customers
                .iter()
                .find(|customer| customer.id == order.user_id)
                .cloned();
            RecentOrder { order, customer }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::activity::ActivityKind;
    use crate::domain::commerce::OrderStatus;
    use crate::metrics::aggregate::Source;
    use crate::reports::fixtures::{days_ago, now};
    use crate::store::memory::{MemoryStore, id};

    #[tokio::test]
    async fn assembles_all_sections() {
        let mut store = MemoryStore::default();
        store.add_user(1, "ana", "member", days_ago(20));
        store.add_product(50, "Poster", "merch", 900);
        store.add_order(10, 1, 50, OrderStatus::Paid, 900, days_ago(3));
        store.add_order(11, 2, 50, OrderStatus::Pending, 900, days_ago(1));
        store.add_track(5, "Single", days_ago(10));
        store.add_playback(5, Some(1), 200, days_ago(2));
        store.add_playback(5, Some(1), 200, days_ago(12));
        store.add_post(30, 1, days_ago(2));

        let report = dashboard(&store, now()).await.unwrap();

        assert_eq!(report.metrics.range.period.as_str(), "month");
        assert_eq!(report.metrics.revenue.period, 900);
        assert_eq!(report.recent_orders.len(), 2);
        assert_eq!(report.recent_orders[0].order.id, id(11));
        assert!(report.recent_orders[0].customer.is_none());
        assert_eq!(
            report.recent_orders[1].customer.as_ref().map(|c| c.name.as_str()),
            Some("ana")
        );
        assert_eq!(report.popular_content.len(), 1);
        assert_eq!(report.popular_content[0].metric, 1);
        assert_eq!(report.recent_activity[0].kind, ActivityKind::Order);
        assert_eq!(report.recent_activity.len(), 4);
    }

    #[tokio::test]
    async fn failing_lookup_aborts_dashboard() {
        let mut store = MemoryStore::default();
        store.add_order(10, 1, 50, OrderStatus::Paid, 900, days_ago(3));
        store.failing = Some(Source::Users);

        assert!(dashboard(&store, now()).await.is_err());
    }
}
