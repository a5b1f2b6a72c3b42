use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use backstage_core::domain::parse_id;
use backstage_core::error::CoreError;
use backstage_core::listing::ListQuery;
use backstage_core::pagination::Page;
use backstage_infra::db::{CatalogRepoError, Listed, fetch_by_id, fetch_page};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Error)]
pub enum CatalogApiError {
    #[error(transparent)]
    Invalid(#[from] CoreError),
    #[error("db not configured")]
    DbUnavailable,
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("db error: {0}")]
    Db(#[from] CatalogRepoError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

pub async fn list<T: Listed>(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Page<T>>, CatalogApiError> {
    let query = ListQuery::parse(T::SPEC, &params)?;
    let pool = state.db.as_ref().ok_or(CatalogApiError::DbUnavailable)?;
    let page = fetch_page::<T>(pool, &query).await?;
    Ok(Json(page))
}

pub async fn get_one<T: Listed>(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<T>, CatalogApiError> {
    let id = parse_id(&raw_id)?;
    let pool = state.db.as_ref().ok_or(CatalogApiError::DbUnavailable)?;
    let record = fetch_by_id::<T>(pool, id)
        .await?
        .ok_or(CatalogApiError::NotFound {
            entity: T::SPEC.name,
            id,
        })?;
    Ok(Json(record))
}

impl IntoResponse for CatalogApiError {
    fn into_response(self) -> Response {
        let (status, field) = match &self {
            CatalogApiError::Invalid(err) => {
                (StatusCode::BAD_REQUEST, Some(err.field().to_string()))
            }
            CatalogApiError::DbUnavailable => (StatusCode::SERVICE_UNAVAILABLE, None),
            CatalogApiError::NotFound { .. } => (StatusCode::NOT_FOUND, None),
            CatalogApiError::Db(err) => {
                warn!(error = %err, "catalog read failed");
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };
        let body = Json(ErrorBody {
            error: self.to_string(),
            field,
        });
        (status, body).into_response()
    }
}
