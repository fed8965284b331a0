//! One-shot AI market analysis.
//!
//! Fetches the current global metrics and top listings, normalizes them,
//! and asks the report service for a narrative market report, printed as
//! pretty JSON. Requires `OPENAI_API_KEY` in addition to the collector
//! configuration.

use chrono::Utc;
use clap::Parser;
use cmc_collector::{
    client::{CmcClient, MarketDataApi},
    config::Config,
    normalize::{normalize_coins, normalize_global},
    report::{MarketSummary, ReportClient},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "analyze", about = "One-shot AI market report")]
struct Args {
    /// How many top coins to feed into the analysis fetch
    #[arg(long, default_value_t = 100)]
    limit: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Configuration error");
            std::process::exit(1);
        }
    };
    let openai_key = match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => key,
        _ => {
            tracing::error!("Missing environment variables: OPENAI_API_KEY");
            std::process::exit(1);
        }
    };

    let client = CmcClient::new(&config.cmc_base_url, &config.cmc_api_key)?;

    tracing::info!("Fetching market data");
    let timestamp = Utc::now();
    let global_envelope = client.fetch_global_metrics().await?;
    let listings = client.fetch_listings(args.limit).await?;

    let global = normalize_global(&global_envelope, timestamp)?;
    let (coins, skipped) = normalize_coins(&listings, timestamp);
    if skipped > 0 {
        tracing::warn!(skipped, "Dropped malformed listings entries");
    }

    let summary = MarketSummary::build(&global, &coins);
    tracing::info!(top_coins = summary.top_coins.len(), "Requesting AI analysis");

    let report = ReportClient::new(openai_key)?.generate(&summary).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
