use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use logtail::server;

#[derive(Parser)]
#[command(name = "logtail")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Serves the tail of log files over HTTP")]
struct Cli {
    /// address:port to bind
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: String,

    /// directory the served files live under
    #[arg(long, default_value = "/var/log")]
    dir: PathBuf,

    /// per-request timeout in milliseconds
    #[arg(long, default_value_t = 2000)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let app = server::router(cli.dir.clone(), Duration::from_millis(cli.timeout));
    let listener = tokio::net::TcpListener::bind(&cli.addr)
        .await
        .context(format!("Failed to bind {}", cli.addr))?;

    info!(addr = %cli.addr, dir = %cli.dir.display(), "serving logs");
    axum::serve(listener, app).await.context("server stopped")?;
    Ok(())
}
