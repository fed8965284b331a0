//! # CoinMarketCap Data Collector
//!
//! Periodically pulls global market metrics and per-coin quotes from the
//! CoinMarketCap API, normalizes them into fixed-shape snapshots, and
//! appends them to Supabase tables. An operator opts coins into collection
//! with the interactive `track` tool; the `analyze` tool turns the latest
//! snapshot into an AI-written market report.
//!
//! ## Usage
//!
//! ```no_run
//! use cmc_collector::{
//!     client::CmcClient, collector::{Collector, CollectorConfig},
//!     config::Config, source::TrackedSource, store::SupabaseStore,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let client = Arc::new(CmcClient::new(&config.cmc_base_url, &config.cmc_api_key)?);
//! let store = Arc::new(SupabaseStore::new(&config.supabase_url, &config.supabase_key)?);
//! let source = Box::new(TrackedSource::new(store.clone()));
//!
//! let collector = Collector::new(client, store, source, CollectorConfig::default());
//! let (_tx, shutdown) = tokio::sync::watch::channel(false);
//! collector.run(shutdown).await;
//! # Ok(())
//! # }
//! ```
//!
//! A cycle that fails at any stage is logged and retried on the next tick
//! with a shorter backoff; the process itself only exits on the shutdown
//! signal or a fatal configuration error at startup.

pub mod client;
pub mod collector;
pub mod config;
pub mod constants;
pub mod error;
pub mod normalize;
pub mod report;
pub mod source;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use client::{CmcClient, MarketDataApi};
pub use collector::{Collector, CollectorConfig, CycleOutcome};
pub use config::Config;
pub use error::{ClientError, ConfigError, NormalizeError, SourceError, StoreError};
pub use source::{CoinSource, TopSource, TrackedSource};
pub use store::{SnapshotStore, SupabaseStore};
pub use types::{CoinSnapshot, GlobalMetricsSnapshot, TrackedCoin, WriteOutcome};
