//! In-memory store used by the engine's own tests. Mirrors the SQL
//! semantics of the Postgres store: inclusive windows, UTC day buckets,
//! id tie-breaks and per-user retention.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::{EntityLookup, MetricsStore};
use crate::domain::activity::{ActivityEntry, ActivityKind};
use crate::domain::catalog::{ArticleSummary, ProductSummary, TrackSummary, UserSummary};
use crate::domain::commerce::{OrderStatus, OrderSummary};
use crate::error::DataAccessError;
use crate::metrics::aggregate::{
    BucketedCount, BucketedSum, GroupAggregate, Grouping, Measure, MetricFilter, Ranking, Source,
};
use crate::metrics::retention::{RetentionOffset, RetentionRow};
use crate::types::period::MetricWindow;

pub fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

struct UserRow {
    id: Uuid,
    name: String,
    role: String,
    created_at: DateTime<Utc>,
}

struct TrackRow {
    id: Uuid,
    title: String,
    created_at: DateTime<Utc>,
}

struct ArticleRow {
    id: Uuid,
    title: String,
    created_at: DateTime<Utc>,
}

struct ProductRow {
    id: Uuid,
    name: String,
    product_type: String,
    price_cents: i64,
}

struct OrderItemRow {
    order_id: Uuid,
    product_id: Uuid,
    quantity: i64,
    unit_price_cents: i64,
}

struct PlaybackRow {
    track_id: Uuid,
    user_id: Option<Uuid>,
    duration_secs: i64,
    played_at: DateTime<Utc>,
}

struct PageViewRow {
    path: String,
    referrer: Option<String>,
    user_id: Option<Uuid>,
    article_id: Option<Uuid>,
    viewed_at: DateTime<Utc>,
}

struct AuthoredRow {
    id: Uuid,
    author_id: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct MemoryStore {
    users: Vec<UserRow>,
    tracks: Vec<TrackRow>,
    articles: Vec<ArticleRow>,
    products: Vec<ProductRow>,
    orders: Vec<OrderSummary>,
    order_items: Vec<OrderItemRow>,
    playbacks: Vec<PlaybackRow>,
    page_views: Vec<PageViewRow>,
    posts: Vec<AuthoredRow>,
    comments: Vec<AuthoredRow>,
    /// Every read touching this source fails.
    pub failing: Option<Source>,
}

impl MemoryStore {
    pub fn add_user(&mut self, n: u128, name: &str, role: &str, at: DateTime<Utc>) {
        self.users.push(UserRow {
            id: id(n),
            name: name.to_string(),
            role: role.to_string(),
            created_at: at,
        });
    }

    pub fn add_track(&mut self, n: u128, title: &str, at: DateTime<Utc>) {
        self.tracks.push(TrackRow {
            id: id(n),
            title: title.to_string(),
            created_at: at,
        });
    }

    pub fn add_article(&mut self, n: u128, title: &str, at: DateTime<Utc>) {
        self.articles.push(ArticleRow {
            id: id(n),
            title: title.to_string(),
            created_at: at,
        });
    }

    pub fn add_product(&mut self, n: u128, name: &str, product_type: &str, price_cents: i64) {
        self.products.push(ProductRow {
            id: id(n),
            name: name.to_string(),
            product_type: product_type.to_string(),
            price_cents,
        });
    }

    /// Adds an order with a single line item for `product`.
    pub fn add_order(
        &mut self,
        n: u128,
        user: u128,
        product: u128,
        status: OrderStatus,
        total_cents: i64,
        at: DateTime<Utc>,
    ) {
        self.orders.push(OrderSummary {
            id: id(n),
            user_id: id(user),
            status,
            total_cents,
            created_at: at,
        });
        self.order_items.push(OrderItemRow {
            order_id: id(n),
            product_id: id(product),
            quantity: 1,
            unit_price_cents: total_cents,
        });
    }

    pub fn add_playback(&mut self, track: u128, user: Option<u128>, secs: i64, at: DateTime<Utc>) {
        self.playbacks.push(PlaybackRow {
            track_id: id(track),
            user_id: user.map(id),
            duration_secs: secs,
            played_at: at,
        });
    }

    pub fn add_page_view(
        &mut self,
        path: &str,
        referrer: Option<&str>,
        user: Option<u128>,
        article: Option<u128>,
        at: DateTime<Utc>,
    ) {
        self.page_views.push(PageViewRow {
            path: path.to_string(),
            referrer: referrer.map(str::to_string),
            user_id: user.map(id),
            article_id: article.map(id),
            viewed_at: at,
        });
    }

    pub fn add_post(&mut self, n: u128, author: u128, at: DateTime<Utc>) {
        self.posts.push(AuthoredRow {
            id: id(n),
            author_id: id(author),
            created_at: at,
        });
    }

    pub fn add_comment(&mut self, n: u128, author: u128, at: DateTime<Utc>) {
        self.comments.push(AuthoredRow {
            id: id(n),
            author_id: id(author),
            created_at: at,
        });
    }

    fn touch(&self, source: Source) -> Result<(), DataAccessError> {
        if self.failing == Some(source) {
            return Err(DataAccessError::new(format!("{source:?} unavailable")));
        }
        Ok(())
    }

    fn paid(&self, order_id: Uuid, window: &MetricWindow) -> bool {
        self.orders.iter().any(|order| {
            order.id == order_id
                && order.status == OrderStatus::Paid
                && window.contains(order.created_at)
        })
    }

    /// Timestamps of `source` rows that pass the window and filter.
    fn timestamps(
        &self,
        source: Source,
        window: Option<&MetricWindow>,
        filter: &MetricFilter,
    ) -> Result<Vec<(DateTime<Utc>, i64)>, DataAccessError> {
        self.touch(source)?;
        filter.ensure_supported(source)?;
        let rows: Vec<(DateTime<Utc>, i64)> = match source {
            Source::Users => self.users.iter().map(|u| (u.created_at, 0)).collect(),
            Source::Tracks => self.tracks.iter().map(|t| (t.created_at, 0)).collect(),
            Source::Articles => self.articles.iter().map(|a| (a.created_at, 0)).collect(),
            Source::Orders => self
                .orders
                .iter()
                .filter(|o| filter.order_status.is_none_or(|s| s == o.status))
                .map(|o| (o.created_at, o.total_cents))
                .collect(),
            Source::Playbacks => self
                .playbacks
                .iter()
                .map(|p| (p.played_at, p.duration_secs))
                .collect(),
            Source::PageViews => self
                .page_views
                .iter()
                .filter(|v| {
                    filter
                        .path_prefix
                        .as_deref()
                        .is_none_or(|prefix| v.path.starts_with(prefix))
                })
                .map(|v| (v.viewed_at, 0))
                .collect(),
            Source::Posts => self.posts.iter().map(|p| (p.created_at, 0)).collect(),
            Source::Comments => self.comments.iter().map(|c| (c.created_at, 0)).collect(),
        };
        Ok(rows
            .into_iter()
            .filter(|(ts, _)| window.is_none_or(|w| w.contains(*ts)))
            .collect())
    }

    fn activity_times(&self, user: Uuid) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        let plays = self
            .playbacks
            .iter()
            .filter(move |p| p.user_id == Some(user))
            .map(|p| p.played_at);
        let views = self
            .page_views
            .iter()
            .filter(move |v| v.user_id == Some(user))
            .map(|v| v.viewed_at);
        plays.chain(views)
    }
}

fn ranked<K: Ord>(totals: HashMap<K, i64>, limit: i64) -> Vec<GroupAggregate<K>> {
    let mut rows: Vec<GroupAggregate<K>> = totals
        .into_iter()
        .map(|(key, value)| GroupAggregate { key, value })
        .collect();
    rows.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.key.cmp(&b.key)));
    rows.truncate(usize::try_from(limit).unwrap_or(0));
    rows
}

#[async_trait]
impl MetricsStore for MemoryStore {
    async fn count_in_window(
        &self,
        source: Source,
        window: Option<&MetricWindow>,
        filter: &MetricFilter,
    ) -> Result<i64, DataAccessError> {
        Ok(self.timestamps(source, window, filter)?.len() as i64)
    }

    async fn sum_in_window(
        &self,
        measure: Measure,
        window: Option<&MetricWindow>,
        filter: &MetricFilter,
    ) -> Result<i64, DataAccessError> {
        let rows = self.timestamps(measure.source(), window, filter)?;
        Ok(rows.iter().map(|(_, value)| value).sum())
    }

    async fn count_by_bucket(
        &self,
        source: Source,
        window: &MetricWindow,
        filter: &MetricFilter,
    ) -> Result<Vec<BucketedCount>, DataAccessError> {
        let mut buckets: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for (ts, _) in self.timestamps(source, Some(window), filter)? {
            *buckets.entry(ts.date_naive()).or_default() += 1;
        }
        Ok(buckets
            .into_iter()
            .map(|(bucket, count)| BucketedCount { bucket, count })
            .collect())
    }

    async fn sum_by_bucket(
        &self,
        measure: Measure,
        window: &MetricWindow,
        filter: &MetricFilter,
    ) -> Result<Vec<BucketedSum>, DataAccessError> {
        let mut buckets: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();
        for (ts, value) in self.timestamps(measure.source(), Some(window), filter)? {
            let entry = buckets.entry(ts.date_naive()).or_default();
            entry.0 += 1;
            entry.1 += value;
        }
        Ok(buckets
            .into_iter()
            .map(|(bucket, (count, total))| BucketedSum {
                bucket,
                count,
                total,
            })
            .collect())
    }

    async fn count_active_users(&self, window: &MetricWindow) -> Result<i64, DataAccessError> {
        self.touch(Source::Playbacks)?;
        self.touch(Source::PageViews)?;
        let plays = self
            .playbacks
            .iter()
            .filter(|p| window.contains(p.played_at))
            .filter_map(|p| p.user_id);
        let views = self
            .page_views
            .iter()
            .filter(|v| window.contains(v.viewed_at))
            .filter_map(|v| v.user_id);
        Ok(plays.chain(views).collect::<BTreeSet<_>>().len() as i64)
    }

    async fn group_totals(
        &self,
        grouping: Grouping,
        window: Option<&MetricWindow>,
        filter: &MetricFilter,
        limit: i64,
    ) -> Result<Vec<GroupAggregate<String>>, DataAccessError> {
        self.touch(grouping.source())?;
        filter.ensure_supported(grouping.source())?;
        let in_window = |ts: DateTime<Utc>| window.is_none_or(|w| w.contains(ts));
        let mut totals: HashMap<String, i64> = HashMap::new();
        match grouping {
            Grouping::UserRole => {
                for user in self.users.iter().filter(|u| in_window(u.created_at)) {
                    *totals.entry(user.role.clone()).or_default() += 1;
                }
            }
            Grouping::PagePath | Grouping::Referrer => {
                let views = self.page_views.iter().filter(|v| {
                    in_window(v.viewed_at)
                        && filter
                            .path_prefix
                            .as_deref()
                            .is_none_or(|prefix| v.path.starts_with(prefix))
                });
                for view in views {
                    let key = match grouping {
                        Grouping::PagePath => view.path.clone(),
                        _ => view
                            .referrer
                            .clone()
                            .filter(|referrer| !referrer.is_empty())
                            .unwrap_or_else(|| "direct".to_string()),
                    };
                    *totals.entry(key).or_default() += 1;
                }
            }
            Grouping::ProductTypeRevenue => {
                for item in &self.order_items {
                    let Some(order) = self.orders.iter().find(|o| o.id == item.order_id) else {
                        continue;
                    };
                    if !in_window(order.created_at)
                        || filter.order_status.is_some_and(|s| s != order.status)
                    {
                        continue;
                    }
                    let Some(product) = self.products.iter().find(|p| p.id == item.product_id)
                    else {
                        continue;
                    };
                    *totals.entry(product.product_type.clone()).or_default() +=
                        item.quantity * item.unit_price_cents;
                }
            }
        }
        Ok(ranked(totals, limit))
    }

    async fn rank(
        &self,
        ranking: Ranking,
        window: &MetricWindow,
        n: i64,
    ) -> Result<Vec<GroupAggregate<Uuid>>, DataAccessError> {
        let mut totals: HashMap<Uuid, i64> = HashMap::new();
        match ranking {
            Ranking::TrackPlays => {
                self.touch(Source::Playbacks)?;
                for play in self.playbacks.iter().filter(|p| window.contains(p.played_at)) {
                    *totals.entry(play.track_id).or_default() += 1;
                }
            }
            Ranking::ArticleViews => {
                self.touch(Source::PageViews)?;
                let views = self
                    .page_views
                    .iter()
                    .filter(|v| window.contains(v.viewed_at))
                    .filter_map(|v| v.article_id);
                for article in views {
                    *totals.entry(article).or_default() += 1;
                }
            }
            Ranking::ProductUnitsSold => {
                self.touch(Source::Orders)?;
                for item in self
                    .order_items
                    .iter()
                    .filter(|i| self.paid(i.order_id, window))
                {
                    *totals.entry(item.product_id).or_default() += item.quantity;
                }
            }
        }
        Ok(ranked(totals, n))
    }

    async fn cohort_retention(
        &self,
        window: &MetricWindow,
        offset: RetentionOffset,
    ) -> Result<Vec<RetentionRow>, DataAccessError> {
        self.touch(Source::Users)?;
        let mut cohorts: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();
        for user in self.users.iter().filter(|u| window.contains(u.created_at)) {
            let retained = self
                .activity_times(user.id)
                .any(|at| offset.is_retained(user.created_at, at));
            let entry = cohorts.entry(user.created_at.date_naive()).or_default();
            entry.0 += 1;
            entry.1 += i64::from(retained);
        }
        Ok(cohorts
            .into_iter()
            .map(|(cohort_date, (total_users, retained_users))| RetentionRow {
                cohort_date,
                total_users,
                retained_users,
            })
            .collect())
    }

    async fn recent_orders(&self, limit: i64) -> Result<Vec<OrderSummary>, DataAccessError> {
        self.touch(Source::Orders)?;
        let mut orders = self.orders.clone();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(orders)
    }

    async fn recent_activity(&self, limit: i64) -> Result<Vec<ActivityEntry>, DataAccessError> {
        for source in [Source::Users, Source::Orders, Source::Posts, Source::Comments] {
            self.touch(source)?;
        }
        let entry = |kind, entity_id, actor_id, occurred_at| ActivityEntry {
            kind,
            entity_id,
            actor_id,
            occurred_at,
        };
        let mut feed: Vec<ActivityEntry> = self
            .users
            .iter()
            .map(|u| entry(ActivityKind::Signup, u.id, u.id, u.created_at))
            .chain(
                self.orders
                    .iter()
                    .map(|o| entry(ActivityKind::Order, o.id, o.user_id, o.created_at)),
            )
            .chain(
                self.posts
                    .iter()
                    .map(|p| entry(ActivityKind::Post, p.id, p.author_id, p.created_at)),
            )
            .chain(
                self.comments
                    .iter()
                    .map(|c| entry(ActivityKind::Comment, c.id, c.author_id, c.created_at)),
            )
            .collect();
        feed.sort_by(|a, b| {
            b.occurred_at
                .cmp(&a.occurred_at)
                .then(b.entity_id.cmp(&a.entity_id))
        });
        feed.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(feed)
    }
}

#[async_trait]
impl EntityLookup<TrackSummary> for MemoryStore {
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<TrackSummary>, DataAccessError> {
        self.touch(Source::Tracks)?;
        Ok(self
            .tracks
            .iter()
            .filter(|t| ids.contains(&t.id))
            .map(|t| TrackSummary {
                id: t.id,
                title: t.title.clone(),
                artist_name: "Band".to_string(),
            })
            .collect())
    }
}

#[async_trait]
impl EntityLookup<ArticleSummary> for MemoryStore {
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ArticleSummary>, DataAccessError> {
        self.touch(Source::Articles)?;
        Ok(self
            .articles
            .iter()
            .filter(|a| ids.contains(&a.id))
            .map(|a| ArticleSummary {
                id: a.id,
                title: a.title.clone(),
                slug: a.title.to_lowercase().replace(' ', "-"),
            })
            .collect())
    }
}

#[async_trait]
impl EntityLookup<ProductSummary> for MemoryStore {
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ProductSummary>, DataAccessError> {
        Ok(self
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .map(|p| ProductSummary {
                id: p.id,
                name: p.name.clone(),
                product_type: p.product_type.clone(),
                price_cents: p.price_cents,
            })
            .collect())
    }
}

#[async_trait]
impl EntityLookup<UserSummary> for MemoryStore {
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserSummary>, DataAccessError> {
        self.touch(Source::Users)?;
        Ok(self
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .map(|u| UserSummary {
                id: u.id,
                name: u.name.clone(),
                role: u.role.clone(),
            })
            .collect())
    }
}
