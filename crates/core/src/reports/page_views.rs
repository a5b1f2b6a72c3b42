use serde::Serialize;

use crate::error::{CoreError, DataAccessError};
use crate::metrics::aggregate::{BucketedCount, GroupAggregate, Grouping, MetricFilter, Source};
use crate::store::MetricsStore;
use crate::types::period::MetricWindow;

const MAX_PATH_LEN: usize = 512;

#[derive(Debug, Clone, Serialize)]
pub struct PageViewReport {
    pub range: MetricWindow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub views_by_day: Vec<BucketedCount>,
    pub top_pages: Vec<GroupAggregate<String>>,
    pub referrers: Vec<GroupAggregate<String>>,
}

/// Validates the optional path prefix filter. Blank means no filter.
pub fn normalize_path(raw: Option<&str>) -> Result<Option<String>, CoreError> {
    let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    if !value.starts_with('/')
        || value.len() > MAX_PATH_LEN
        || value.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(CoreError::InvalidPath(value.to_string()));
    }
    Ok(Some(value.to_string()))
}

pub async fn page_views<S>(
    store: &S,
    window: &MetricWindow,
    path: Option<String>,
    limit: i64,
) -> Result<PageViewReport, DataAccessError>
where
    S: MetricsStore + ?Sized,
{
    let filter = MetricFilter::path_prefix(path.clone());
    let (views_by_day, top_pages, referrers) = tokio::try_join!(
        store.count_by_bucket(Source::PageViews, window, &filter),
        store.group_totals(Grouping::PagePath, Some(window), &filter, limit),
        store.group_totals(Grouping::Referrer, Some(window), &filter, limit),
    )?;

    Ok(PageViewReport {
        range: *window,
        path,
        views_by_day,
        top_pages,
        referrers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::fixtures::{days_ago, now};
    use crate::store::memory::MemoryStore;
    use crate::types::period::Period;

    #[test]
    fn path_validation() {
        assert_eq!(normalize_path(None).unwrap(), None);
        assert_eq!(normalize_path(Some("  ")).unwrap(), None);
        assert_eq!(
            normalize_path(Some(" /blog ")).unwrap().as_deref(),
            Some("/blog")
        );
        assert!(normalize_path(Some("blog")).is_err());
        assert!(normalize_path(Some("/a b")).is_err());
        let long = format!("/{}", "a".repeat(MAX_PATH_LEN));
        assert_eq!(normalize_path(Some(&long)).unwrap_err().field(), "path");
    }

    #[tokio::test]
    async fn path_prefix_narrows_every_section() {
        let mut store = MemoryStore::default();
        store.add_page_view("/blog/a", Some("news.example"), None, None, days_ago(1));
        store.add_page_view("/blog/a", None, None, None, days_ago(1));
        store.add_page_view("/blog/b", Some("news.example"), None, None, days_ago(2));
        store.add_page_view("/shop", Some("ads.example"), None, None, days_ago(1));
        let window = MetricWindow::for_period(Period::Week, now());

        let report = page_views(&store, &window, Some("/blog".to_string()), 10)
            .await
            .unwrap();

        let total: i64 = report.views_by_day.iter().map(|b| b.count).sum();
        assert_eq!(total, 3);
        assert_eq!(report.top_pages[0].key, "/blog/a");
        assert_eq!(report.top_pages[0].value, 2);
        assert_eq!(report.referrers[0].key, "news.example");
        assert_eq!(report.referrers[1].key, "direct");
        assert!(report.referrers.iter().all(|r| r.key != "ads.example"));
    }

    #[tokio::test]
    async fn top_pages_respect_limit() {
        let mut store = MemoryStore::default();
        for path in ["/a", "/b", "/c", "/c"] {
            store.add_page_view(path, None, None, None, days_ago(1));
        }
        let window = MetricWindow::for_period(Period::Day, now());

        let report = page_views(&store, &window, None, 2).await.unwrap();

        let keys: Vec<&str> = report.top_pages.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["/c", "/a"]);
    }
}
