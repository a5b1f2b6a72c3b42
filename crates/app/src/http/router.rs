use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware;
use axum::routing::get;
use backstage_infra::db::{
    AlbumRecord, ArticleRecord, CommentRecord, EpisodeRecord, GroupRecord, Listed, OrderRecord,
    PlaylistRecord, PostRecord, ProductRecord, ShowRecord, TrackRecord, UserRecord,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::middleware::admin_auth;
use crate::http::routes::admin::{catalog, metrics};
use crate::http::routes::health;
use crate::state::AppState;

pub fn build(state: AppState) -> Router {
    let cors = build_cors(&state);
    let mut router = Router::new()
        .route("/health", get(health::health))
        .nest("/v2/admin", admin_routes(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    if let Some(cors) = cors {
        router = router.layer(cors);
    }
    router
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/metrics/overview", get(metrics::get_overview))
        .route("/metrics/users", get(metrics::get_users))
        .route("/metrics/content", get(metrics::get_content))
        .route("/metrics/revenue", get(metrics::get_revenue))
        .route("/metrics/page-views", get(metrics::get_page_views))
        .route("/metrics/dashboard", get(metrics::get_dashboard));
    let router = catalog_routes::<UserRecord>(router);
    let router = catalog_routes::<ArticleRecord>(router);
    let router = catalog_routes::<TrackRecord>(router);
    let router = catalog_routes::<AlbumRecord>(router);
    let router = catalog_routes::<PlaylistRecord>(router);
    let router = catalog_routes::<ShowRecord>(router);
    let router = catalog_routes::<EpisodeRecord>(router);
    let router = catalog_routes::<ProductRecord>(router);
    let router = catalog_routes::<OrderRecord>(router);
    let router = catalog_routes::<PostRecord>(router);
    let router = catalog_routes::<CommentRecord>(router);
    let router = catalog_routes::<GroupRecord>(router);
    router.route_layer(middleware::from_fn_with_state(
        state.clone(),
        admin_auth::require_admin,
    ))
}

fn catalog_routes<T: Listed>(router: Router<AppState>) -> Router<AppState> {
    let name = T::SPEC.name;
    router
        .route(&format!("/{name}"), get(catalog::list::<T>))
        .route(&format!("/{name}/{{id}}"), get(catalog::get_one::<T>))
}

fn build_cors(state: &AppState) -> Option<CorsLayer> {
    let mut origins = Vec::new();
    let mut allow_any = false;
    for origin in state.config.cors_allow_origins.iter() {
        if is_wildcard_origin(origin) {
            allow_any = true;
            break;
        }
        match HeaderValue::from_str(origin.trim()) {
            Ok(value) => origins.push(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "invalid CORS origin ignored");
            }
        }
    }

    if !should_enable_cors(allow_any, &origins) {
        return None;
    }

    let cors = CorsLayer::new().allow_methods([Method::GET, Method::OPTIONS]);
    if allow_any {
        Some(cors.allow_origin(Any).allow_headers(Any))
    } else {
        Some(
            cors.allow_origin(AllowOrigin::list(origins))
                .allow_credentials(true)
                .allow_headers([AUTHORIZATION, CONTENT_TYPE]),
        )
    }
}

fn is_wildcard_origin(origin: &str) -> bool {
    origin.trim() == "*"
}

fn should_enable_cors(allow_any: bool, origins: &[HeaderValue]) -> bool {
    allow_any || !origins.is_empty()
}
