use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::Identified;
use crate::error::DataAccessError;
use crate::metrics::aggregate::{GroupAggregate, Ranking};
use crate::store::{EntityLookup, MetricsStore};
use crate::types::period::MetricWindow;

/// Leaderboard row. `entity` is `None` when the ranked id no longer
/// resolves (soft-deleted or removed); the row is kept regardless.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem<T> {
    pub key: Uuid,
    pub metric: i64,
    pub entity: Option<T>,
}

/// Aggregates the top `n` keys, then fetches their details in one batch.
pub async fn top_n<T, S>(
    store: &S,
    ranking: Ranking,
    window: &MetricWindow,
    n: i64,
) -> Result<Vec<RankedItem<T>>, DataAccessError>
where
    T: Identified + Send,
    S: MetricsStore + EntityLookup<T> + ?Sized,
{
    let mut aggregates = store.rank(ranking, window, n).await?;
    aggregates.truncate(usize::try_from(n).unwrap_or(0));
    if aggregates.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = aggregates.iter().map(|entry| entry.key).collect();
    let details = <S as EntityLookup<T>>::find_by_ids(store, &ids).await?;
    Ok(join_back(aggregates, details))
}

/// Zips aggregates with detail records by id, keeping aggregate order.
pub fn join_back<T: Identified>(
    aggregates: Vec<GroupAggregate<Uuid>>,
    details: Vec<T>,
) -> Vec<RankedItem<T>> {
    let mut by_id: HashMap<Uuid, T> = details
        .into_iter()
        .map(|detail| (detail.id(), detail))
        .collect();
    aggregates
        .into_iter()
        .map(|entry| RankedItem {
            key: entry.key,
            metric: entry.value,
            entity: by_id.remove(&entry.key),
        })
        .collect()
}
