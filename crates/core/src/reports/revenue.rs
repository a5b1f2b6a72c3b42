use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::catalog::ProductSummary;
use crate::domain::commerce::OrderStatus;
use crate::error::DataAccessError;
use crate::metrics::aggregate::{
    BucketedSum, GroupAggregate, Grouping, Measure, MetricFilter, Ranking,
};
use crate::metrics::ranking::{RankedItem, top_n};
use crate::store::ReportStore;
use crate::types::period::MetricWindow;

#[derive(Debug, Clone, Serialize)]
pub struct RevenueAnalytics {
    pub range: MetricWindow,
    pub orders_by_day: Vec<DailyRevenue>,
    pub revenue_by_product_type: Vec<GroupAggregate<String>>,
    pub top_selling_products: Vec<RankedItem<ProductSummary>>,
}

/// Paid orders placed on `day` (UTC) and their value in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyRevenue {
    pub day: NaiveDate,
    pub orders: i64,
    pub revenue: i64,
}

pub async fn revenue_analytics<S>(
    store: &S,
    window: &MetricWindow,
    limit: i64,
) -> Result<RevenueAnalytics, DataAccessError>
where
    S: ReportStore + ?Sized,
{
    let paid = MetricFilter::status(OrderStatus::Paid);
    let (orders_by_day, revenue_by_product_type, top_selling_products) = tokio::try_join!(
        store.sum_by_bucket(Measure::OrderRevenue, window, &paid),
        store.group_totals(Grouping::ProductTypeRevenue, Some(window), &paid, limit),
        top_n::<ProductSummary, S>(store, Ranking::ProductUnitsSold, window, limit),
    )?;

    Ok(RevenueAnalytics {
        range: *window,
        orders_by_day: orders_by_day.into_iter().map(map_daily).collect(),
        revenue_by_product_type,
        top_selling_products,
    })
}

fn map_daily(entry: BucketedSum) -> DailyRevenue {
    DailyRevenue {
        day: entry.bucket,
        orders: entry.count,
        revenue: entry.total,
    }
}
