use std::io::Read;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use landed_models::{CalculationRequest, ReferenceData};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "landed", about = "Landed cost, tariff and trade-timing engine")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/landed.toml", global = true)]
    config: String,

    /// Pretty-print the output JSON
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the landed cost of a CalculationRequest
    Calculate {
        /// Read the request JSON from a file instead of stdin
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Exchange-rate trend analysis for a trade corridor
    Fx {
        #[arg(long)]
        importing: String,
        #[arg(long)]
        exporting: String,
    },
    /// BUY/WAIT/HOLD recommendation from news sentiment
    Predict {
        #[arg(long)]
        importing: String,
        #[arg(long)]
        exporting: String,
        /// Fetch fresh news before scoring
        #[arg(long)]
        refresh_news: bool,
    },
    /// Load countries, tariff, shipping and exchange rates from a JSON file
    Seed {
        #[arg(short, long)]
        file: String,
    },
    /// Check the tariff scraper service
    ScraperHealth,
}

fn read_input(input: Option<&str>) -> Result<String> {
    match input {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read input: {path}"))
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = landed::load_config(&cli.config)?;
    let engine = landed::build_engine(&config).context("Failed to build engine")?;

    match cli.command {
        Command::Calculate { input } => {
            let raw = read_input(input.as_deref())?;
            let request: Option<CalculationRequest> =
                serde_json::from_str(&raw).context("Failed to parse CalculationRequest JSON")?;
            let breakdown = engine
                .calculate_input(request.as_ref())
                .await
                .map_err(|e| anyhow::anyhow!("Calculation failed: {e}"))?;
            print_json(&breakdown, cli.pretty)
        }
        Command::Fx {
            importing,
            exporting,
        } => {
            let analysis = engine
                .analyze_exchange_rates(&importing, &exporting)
                .await
                .map_err(|e| anyhow::anyhow!("Exchange-rate analysis failed: {e}"))?;
            print_json(&analysis, cli.pretty)
        }
        Command::Predict {
            importing,
            exporting,
            refresh_news,
        } => {
            let prediction = engine
                .predict(&importing, &exporting, refresh_news)
                .await
                .map_err(|e| anyhow::anyhow!("Prediction failed: {e}"))?;
            print_json(&prediction, cli.pretty)
        }
        Command::Seed { file } => {
            let raw = read_input(Some(&file))?;
            let data: ReferenceData =
                serde_json::from_str(&raw).context("Failed to parse reference data JSON")?;
            let summary = engine.seed(&data).context("Seeding failed")?;
            print_json(
                &json!({
                    "countries": summary.countries,
                    "tariff_rates": summary.tariff_rates,
                    "shipping_rates": summary.shipping_rates,
                    "exchange_rates": summary.exchange_rates,
                }),
                cli.pretty,
            )
        }
        Command::ScraperHealth => {
            let healthy = engine.scraper_health().await.unwrap_or(false);
            print_json(
                &json!({ "base_url": config.scraper.base_url, "healthy": healthy }),
                cli.pretty,
            )
        }
    }
}
