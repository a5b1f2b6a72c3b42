use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::AppConfig;
use crate::state::AppState;
use backstage_infra::db::{DbPoolError, connect_lazy};

#[derive(Debug, Error)]
pub enum WiringError {
    #[error("db pool error: {0}")]
    Db(#[from] DbPoolError),
}

pub fn build_state(config: AppConfig) -> Result<AppState, WiringError> {
    let db = match config.database_url.as_deref() {
        Some(url) => Some(connect_lazy(url, config.db_max_connections)?),
        None => {
            info!("BACKSTAGE_DATABASE_URL not set; data endpoints will answer 503");
            None
        }
    };
    Ok(AppState {
        config: Arc::new(config),
        db,
    })
}
