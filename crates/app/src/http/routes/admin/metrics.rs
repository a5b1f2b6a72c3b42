use std::future::Future;
use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use backstage_core::domain::catalog::ContentType;
use backstage_core::error::{CoreError, DataAccessError};
use backstage_core::metrics::retention::RetentionOffset;
use backstage_core::pagination::parse_int_param;
use backstage_core::reports::{
    self, ContentAnalytics, Dashboard, OverviewReport, PageViewReport, RevenueAnalytics,
    UserAnalytics, normalize_path, parse_top_limit,
};
use backstage_core::types::period::{MetricWindow, Period, PeriodKind};
use backstage_core::types::time_range::DateRange;
use backstage_infra::PgStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub period: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub period: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub offset_days: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContentQuery {
    pub period: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub content_type: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RevenueQuery {
    pub period: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageViewsQuery {
    pub period: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub path: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Error)]
pub enum MetricsApiError {
    #[error(transparent)]
    Invalid(#[from] CoreError),
    #[error("db not configured")]
    DbUnavailable,
    #[error("report timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Data(#[from] DataAccessError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

pub async fn get_overview(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<OverviewReport>, MetricsApiError> {
    let window = parse_window(
        query.period.as_deref(),
        query.from.as_deref(),
        query.to.as_deref(),
        Utc::now(),
    )?;
    let store = require_store(&state)?;
    run_report(&state, "overview", window.period, reports::overview(&store, &window)).await
}

pub async fn get_users(
    State(state): State<AppState>,
    Query(query): Query<UsersQuery>,
) -> Result<Json<UserAnalytics>, MetricsApiError> {
    let window = parse_window(
        query.period.as_deref(),
        query.from.as_deref(),
        query.to.as_deref(),
        Utc::now(),
    )?;
    let offset = match parse_int_param("offset_days", query.offset_days.as_deref())? {
        Some(days) => RetentionOffset::days(days)?,
        None => state.config.retention_offset,
    };
    let store = require_store(&state)?;
    run_report(
        &state,
        "users",
        window.period,
        reports::user_analytics(&store, &window, offset),
    )
    .await
}

pub async fn get_content(
    State(state): State<AppState>,
    Query(query): Query<ContentQuery>,
) -> Result<Json<ContentAnalytics>, MetricsApiError> {
    let window = parse_window(
        query.period.as_deref(),
        query.from.as_deref(),
        query.to.as_deref(),
        Utc::now(),
    )?;
    let content_type = match query.content_type.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => raw.parse::<ContentType>()?,
        _ => ContentType::All,
    };
    let limit = parse_top_limit(parse_int_param("limit", query.limit.as_deref())?)?;
    let store = require_store(&state)?;
    run_report(
        &state,
        "content",
        window.period,
        reports::content_analytics(&store, &window, content_type, limit),
    )
    .await
}

pub async fn get_revenue(
    State(state): State<AppState>,
    Query(query): Query<RevenueQuery>,
) -> Result<Json<RevenueAnalytics>, MetricsApiError> {
    let window = parse_window(
        query.period.as_deref(),
        query.from.as_deref(),
        query.to.as_deref(),
        Utc::now(),
    )?;
    let limit = parse_top_limit(parse_int_param("limit", query.limit.as_deref())?)?;
    let store = require_store(&state)?;
    run_report(
        &state,
        "revenue",
        window.period,
        reports::revenue_analytics(&store, &window, limit),
    )
    .await
}

pub async fn get_page_views(
    State(state): State<AppState>,
    Query(query): Query<PageViewsQuery>,
) -> Result<Json<PageViewReport>, MetricsApiError> {
    let window = parse_window(
        query.period.as_deref(),
        query.from.as_deref(),
        query.to.as_deref(),
        Utc::now(),
    )?;
    let path = normalize_path(query.path.as_deref())?;
    let limit = parse_top_limit(parse_int_param("limit", query.limit.as_deref())?)?;
    let store = require_store(&state)?;
    run_report(
        &state,
        "page_views",
        window.period,
        reports::page_views(&store, &window, path, limit),
    )
    .await
}

pub async fn get_dashboard(
    State(state): State<AppState>,
) -> Result<Json<Dashboard>, MetricsApiError> {
    let store = require_store(&state)?;
    run_report(
        &state,
        "dashboard",
        PeriodKind::Month,
        reports::dashboard(&store, Utc::now()),
    )
    .await
}

fn parse_window(
    period: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
    now: DateTime<Utc>,
) -> Result<MetricWindow, CoreError> {
    let period = period
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::parse::<Period>)
        .transpose()?;
    let range = DateRange::from_params(from, to)?;
    Ok(MetricWindow::resolve(period, range, now))
}

fn require_store(state: &AppState) -> Result<PgStore, MetricsApiError> {
    state.store().ok_or(MetricsApiError::DbUnavailable)
}

async fn run_report<T, F>(
    state: &AppState,
    report: &'static str,
    period: PeriodKind,
    build: F,
) -> Result<Json<T>, MetricsApiError>
where
    F: Future<Output = Result<T, DataAccessError>>,
{
    let deadline = state.config.report_timeout;
    let started = Instant::now();
    let result = tokio::time::timeout(deadline, build)
        .await
        .map_err(|_| MetricsApiError::Timeout(deadline))??;
    info!(
        report,
        %period,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "report built"
    );
    Ok(Json(result))
}

impl IntoResponse for MetricsApiError {
    fn into_response(self) -> Response {
        let (status, field) = match &self {
            MetricsApiError::Invalid(err) => {
                (StatusCode::BAD_REQUEST, Some(err.field().to_string()))
            }
            MetricsApiError::DbUnavailable => (StatusCode::SERVICE_UNAVAILABLE, None),
            MetricsApiError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, None),
            MetricsApiError::Data(err) => {
                warn!(error = %err, "report failed");
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

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 31, 8, 0, 0).unwrap()
    }

    #[test]
    fn missing_period_defaults_to_month() {
        let window = parse_window(None, None, None, now()).unwrap();
        assert_eq!(window.period, PeriodKind::Month);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 2, 29, 8, 0, 0).unwrap());
        assert_eq!(window.end, now());
    }

    #[test]
    fn explicit_range_wins_over_period() {
        let window =
            parse_window(Some("week"), Some("2024-01-01"), Some("2024-01-31"), now()).unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(
            window.end.date_naive(),
            chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
        );
        assert_eq!(window.period, PeriodKind::Week);
    }

    #[test]
    fn bad_period_names_its_field() {
        let err = parse_window(Some("fortnight"), None, None, now()).unwrap_err();
        assert_eq!(err.field(), "period");
        let err = parse_window(None, Some("2024-01-01"), None, now()).unwrap_err();
        assert_eq!(err.field(), "range");
    }

    #[test]
    fn error_statuses() {
        let invalid = MetricsApiError::from(CoreError::InvalidPeriod("x".to_string()));
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            MetricsApiError::DbUnavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            MetricsApiError::Timeout(Duration::from_secs(1)).into_response().status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        let data = MetricsApiError::from(DataAccessError::new("boom"));
        assert_eq!(data.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn slow_report_times_out() {
        let mut config = crate::config::AppConfig::from_lookup(|_| None).unwrap();
        config.report_timeout = Duration::from_millis(10);
        let state = AppState {
            config: std::sync::Arc::new(config),
            db: None,
        };
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, DataAccessError>(1_u8)
        };
        let err = run_report(&state, "slow", PeriodKind::Day, slow).await.unwrap_err();
        assert!(matches!(err, MetricsApiError::Timeout(_)));
    }
}
