use std::net::SocketAddr;
use std::time::Duration;

use backstage_core::metrics::retention::RetentionOffset;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub report_timeout: Duration,
    pub retention_offset: RetentionOffset,
    pub admin_token_secret: Option<String>,
    pub cors_allow_origins: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid socket address: {0}")]
    InvalidSocket(String),
    #[error("invalid integer for {0}: {1}")]
    InvalidNumber(&'static str, String),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
    #[error("dotenv error: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let env = Env(lookup);
        let http_addr_raw = env.string("BACKSTAGE_HTTP_ADDR", "127.0.0.1:8080");
        let http_addr = http_addr_raw
            .parse()
            .map_err(|_| ConfigError::InvalidSocket(http_addr_raw.clone()))?;
        let database_url = env.optional("BACKSTAGE_DATABASE_URL");
        let db_max_connections = env.number::<u32>("BACKSTAGE_DB_MAX_CONNECTIONS", 5)?;
        if db_max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "BACKSTAGE_DB_MAX_CONNECTIONS",
                "0".to_string(),
            ));
        }
        let report_timeout_secs = env.number::<u64>("BACKSTAGE_REPORT_TIMEOUT_SECS", 10)?;
        if report_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "BACKSTAGE_REPORT_TIMEOUT_SECS",
                "0".to_string(),
            ));
        }
        let retention_days = env.number::<i64>("BACKSTAGE_RETENTION_OFFSET_DAYS", 7)?;
        let retention_offset = RetentionOffset::days(retention_days).map_err(|_| {
            ConfigError::InvalidValue("BACKSTAGE_RETENTION_OFFSET_DAYS", retention_days.to_string())
        })?;
        let admin_token_secret = env.optional("BACKSTAGE_ADMIN_TOKEN_SECRET");
        let cors_allow_origins = env
            .optional("BACKSTAGE_CORS_ALLOW_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            http_addr,
            database_url,
            db_max_connections,
            report_timeout: Duration::from_secs(report_timeout_secs),
            retention_offset,
            admin_token_secret,
            cors_allow_origins,
        })
    }
}

/// Loads `.env` into the process environment when present. Variables that
/// are already set win.
pub fn load_dotenv() -> Result<(), ConfigError> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(err.into()),
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&'static str) -> Option<String>,
{
    fn string(&self, key: &'static str, default: &'static str) -> String {
        (self.0)(key).unwrap_or_else(|| default.to_string())
    }

    fn optional(&self, key: &'static str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn number<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr + ToString,
    {
        let raw = (self.0)(key).unwrap_or_else(|| default.to_string());
        raw.trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber(key, raw))
    }
}
