use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use landed_loader::config::LoaderConfig;
use landed_loader::daemon::Daemon;

#[derive(Parser, Debug)]
#[command(
    name = "landed-loader",
    about = "Landed loader daemon - backfills exchange-rate history and refreshes news sentiment in the shared SQLite store"
)]
struct Cli {
    /// Path to loader configuration file
    #[arg(short, long, default_value = "config/landed-loader.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read config: {}", cli.config))?;
    let config: LoaderConfig =
        toml::from_str(&config_str).with_context(|| "Failed to parse loader config")?;

    let sqlite_path = config.store.sqlite_path.clone();
    let daemon = Daemon::from_config(config)
        .with_context(|| format!("Failed to start loader on {sqlite_path}"))?;
    let cancel = daemon.cancel_token();

    // Handle shutdown signals
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received shutdown signal");
        cancel.cancel();
    });

    daemon
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Daemon error: {e}"))?;

    Ok(())
}
