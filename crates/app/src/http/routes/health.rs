use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: ModuleStatus,
    pub admin_auth: ModuleStatus,
}

#[derive(Debug, Serialize)]
pub struct ModuleStatus {
    pub configured: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let admin_configured = state
        .config
        .admin_token_secret
        .as_ref()
        .is_some_and(|value| !value.is_empty());
    Json(HealthResponse {
        status: "ok",
        database: ModuleStatus {
            configured: state.db.is_some(),
        },
        admin_auth: ModuleStatus {
            configured: admin_configured,
        },
    })
}
