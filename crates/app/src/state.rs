use std::sync::Arc;

use backstage_infra::PgStore;
use backstage_infra::db::DbPool;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Option<DbPool>,
}

impl AppState {
    /// Report store over the shared pool; `None` when no database is configured.
    pub fn store(&self) -> Option<PgStore> {
        self.db.clone().map(PgStore::new)
    }
}
