mod cli;
mod config;
mod http;
mod state;
mod wiring;

use clap::Parser;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::ConfigError;
use crate::http::HttpError;
use crate::wiring::WiringError;
use backstage_infra::db::run_migrations;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("wiring error: {0}")]
    Wiring(#[from] WiringError),
    #[error("db error: {0}")]
    Db(#[from] backstage_infra::db::DbPoolError),
    #[error("http error: {0}")]
    Http(#[from] HttpError),
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    config::load_dotenv()?;
    let mut config = config::AppConfig::from_env()?;
    if let Some(addr) = cli.http_addr {
        config.http_addr = addr;
    }
    let state = wiring::build_state(config)?;

    match (state.db.as_ref(), cli.skip_migrations) {
        (Some(pool), false) => {
            let applied = run_migrations(pool).await?;
            info!(migrations = applied, "schema up to date");
        }
        (Some(_), true) => info!("skipping migrations"),
        (None, _) => {}
    }

    let addr = state.config.http_addr;
    info!(%addr, "http server starting");
    http::serve(addr, state, shutdown_signal()).await?;
    info!("http server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to install ctrl-c handler");
    }
    info!("shutdown signal received");
}
