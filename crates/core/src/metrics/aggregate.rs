use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::commerce::OrderStatus;
use crate::error::DataAccessError;
use crate::metrics::rate::period_share;
use crate::store::MetricsStore;
use crate::types::period::MetricWindow;

/// Record families the aggregator can count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Users,
    Tracks,
    Articles,
    Orders,
    Playbacks,
    PageViews,
    Posts,
    Comments,
}

/// Summable numeric fields. Money is carried in integer cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    OrderRevenue,
    ListeningSeconds,
}

impl Measure {
    pub fn source(self) -> Source {
        match self {
            Measure::OrderRevenue => Source::Orders,
            Measure::ListeningSeconds => Source::Playbacks,
        }
    }
}

/// Predicates ANDed with the window predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricFilter {
    pub order_status: Option<OrderStatus>,
    pub path_prefix: Option<String>,
}

impl MetricFilter {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn status(status: OrderStatus) -> Self {
        Self {
            order_status: Some(status),
            ..Self::default()
        }
    }

    pub fn path_prefix(prefix: Option<String>) -> Self {
        Self {
            path_prefix: prefix,
            ..Self::default()
        }
    }

    /// Name of the first predicate `source` has no column for.
    pub fn unsupported_by(&self, source: Source) -> Option<&'static str> {
        if self.order_status.is_some() && source != Source::Orders {
            return Some("order_status");
        }
        if self.path_prefix.is_some() && source != Source::PageViews {
            return Some("path");
        }
        None
    }

    /// Store implementations call this before touching `source`.
    pub fn ensure_supported(&self, source: Source) -> Result<(), DataAccessError> {
        match self.unsupported_by(source) {
            Some(column) => Err(DataAccessError::new(format!(
                "filter {column} does not apply to {source:?}"
            ))),
            None => Ok(()),
        }
    }
}

/// Rows per UTC day, ascending by `bucket`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketedCount {
    pub bucket: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketedSum {
    pub bucket: NaiveDate,
    pub count: i64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupAggregate<K> {
    pub key: K,
    pub value: i64,
}

/// Label-keyed breakdowns. Each one is ordered by value descending, then key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    UserRole,
    PagePath,
    Referrer,
    ProductTypeRevenue,
}

impl Grouping {
    pub fn source(self) -> Source {
        match self {
            Grouping::UserRole => Source::Users,
            Grouping::PagePath | Grouping::Referrer => Source::PageViews,
            Grouping::ProductTypeRevenue => Source::Orders,
        }
    }
}

/// Entity-keyed leaderboards whose keys are joined back to detail records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
    /// Playbacks per track.
    TrackPlays,
    /// Page views per article.
    ArticleViews,
    /// Units sold per product, paid orders only.
    ProductUnitsSold,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateMetric {
    pub total: i64,
    pub period: i64,
    pub period_share: f64,
}

impl AggregateMetric {
    pub fn new(total: i64, period: i64) -> Self {
        Self {
            total,
            period,
            period_share: period_share(total, period),
        }
    }
}

/// All-time count next to the in-window count for one source.
pub async fn aggregate_metric<S>(
    store: &S,
    source: Source,
    window: &MetricWindow,
    filter: &MetricFilter,
) -> Result<AggregateMetric, DataAccessError>
where
    S: MetricsStore + ?Sized,
{
    let (total, period) = tokio::try_join!(
        store.count_in_window(source, None, filter),
        store.count_in_window(source, Some(window), filter),
    )?;
    Ok(AggregateMetric::new(total, period))
}
