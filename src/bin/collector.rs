//! Unattended market data collector.
//!
//! Runs the collection loop until interrupted. `--source tracked` scopes the
//! fetch to the operator's tracked-coin registry; `--source top` follows the
//! top coins by market cap.

use clap::{Parser, ValueEnum};
use cmc_collector::{
    client::CmcClient,
    collector::{Collector, CollectorConfig},
    config::Config,
    source::{CoinSource, TopSource, TrackedSource},
    store::SupabaseStore,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceKind {
    /// Collect only coins from the tracked_coins registry
    Tracked,
    /// Collect the top coins by market cap
    Top,
}

#[derive(Parser)]
#[command(name = "collector", about = "CoinMarketCap market data collector")]
struct Args {
    /// Which coins to collect each cycle
    #[arg(long, value_enum, default_value = "tracked")]
    source: SourceKind,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    // Missing configuration is fatal at startup, never retried.
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Configuration error");
            std::process::exit(1);
        }
    };

    let client = Arc::new(CmcClient::new(&config.cmc_base_url, &config.cmc_api_key)?);
    let store = Arc::new(SupabaseStore::new(
        &config.supabase_url,
        &config.supabase_key,
    )?);

    let source: Box<dyn CoinSource> = match args.source {
        SourceKind::Tracked => Box::new(TrackedSource::new(store.clone())),
        SourceKind::Top => Box::new(TopSource::new(client.clone(), config.top_limit)),
    };

    let collector = Collector::new(
        client,
        store,
        source,
        CollectorConfig {
            interval: config.interval,
            error_backoff: config.error_backoff,
        },
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    collector.run(shutdown_rx).await;
    Ok(())
}
