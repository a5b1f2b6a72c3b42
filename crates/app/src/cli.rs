use std::net::SocketAddr;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Start without applying pending schema migrations.
    #[arg(long, default_value_t = false)]
    pub skip_migrations: bool,
    /// Overrides BACKSTAGE_HTTP_ADDR.
    #[arg(long)]
    pub http_addr: Option<SocketAddr>,
}
