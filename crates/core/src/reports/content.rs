use serde::Serialize;

use crate::domain::catalog::{ArticleSummary, ContentType, TrackSummary};
use crate::error::DataAccessError;
use crate::metrics::aggregate::{BucketedCount, MetricFilter, Ranking, Source};
use crate::metrics::ranking::{RankedItem, top_n};
use crate::store::ReportStore;
use crate::types::period::MetricWindow;

#[derive(Debug, Clone, Serialize)]
pub struct ContentAnalytics {
    pub range: MetricWindow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracks: Option<TrackStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub articles: Option<ArticleStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackStats {
    pub created: Vec<BucketedCount>,
    pub plays: Vec<BucketedCount>,
    pub top_played: Vec<RankedItem<TrackSummary>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleStats {
    pub published: Vec<BucketedCount>,
    pub top_viewed: Vec<RankedItem<ArticleSummary>>,
}

pub async fn content_analytics<S>(
    store: &S,
    window: &MetricWindow,
    content_type: ContentType,
    limit: i64,
) -> Result<ContentAnalytics, DataAccessError>
where
    S: ReportStore + ?Sized,
{
    let (tracks, articles) = tokio::try_join!(
        track_stats(store, window, content_type, limit),
        article_stats(store, window, content_type, limit),
    )?;
    Ok(ContentAnalytics {
        range: *window,
        tracks,
        articles,
    })
}

async fn track_stats<S>(
    store: &S,
    window: &MetricWindow,
    content_type: ContentType,
    limit: i64,
) -> Result<Option<TrackStats>, DataAccessError>
where
    S: ReportStore + ?Sized,
{
    if !content_type.includes_tracks() {
        return Ok(None);
    }
    let none = MetricFilter::none();
    let (created, plays, top_played) = tokio::try_join!(
        store.count_by_bucket(Source::Tracks, window, &none),
        store.count_by_bucket(Source::Playbacks, window, &none),
        top_n::<TrackSummary, S>(store, Ranking::TrackPlays, window, limit),
    )?;
    Ok(Some(TrackStats {
        created,
        plays,
        top_played,
    }))
}

async fn article_stats<S>(
    store: &S,
    window: &MetricWindow,
    content_type: ContentType,
    limit: i64,
) -> Result<Option<ArticleStats>, DataAccessError>
where
    S: ReportStore + ?Sized,
{
    if !content_type.includes_articles() {
        return Ok(None);
    }
    let none = MetricFilter::none();
    let (published, top_viewed) = tokio::try_join!(
        store.count_by_bucket(Source::Articles, window, &none),
        top_n::<ArticleSummary, S>(store, Ranking::ArticleViews, window, limit),
    )?;
    Ok(Some(ArticleStats {
        published,
        top_viewed,
    }))
}
