//! Normalized records for the market data collector

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One global market snapshot per collection tick
///
/// Every numeric field is finite and non-negative; a field absent upstream is
/// coerced to 0 rather than omitted, so every row has the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalMetricsSnapshot {
    /// Collection-tick timestamp (ISO-8601 UTC)
    pub timestamp: DateTime<Utc>,
    /// Bitcoin market-cap dominance, 0..=100
    pub btc_dominance: f64,
    /// Ethereum market-cap dominance
    pub eth_dominance: f64,
    /// Total market capitalization in USD
    pub total_market_cap: f64,
    /// Total 24h traded volume in USD
    pub total_volume_24h: f64,
    pub active_cryptocurrencies: i64,
    pub active_market_pairs: i64,
    pub active_exchanges: i64,
    pub defi_volume_24h: f64,
    pub defi_market_cap: f64,
    pub stablecoin_volume_24h: f64,
    pub stablecoin_market_cap: f64,
    /// Upstream-reported update time, absent when upstream omits it
    pub last_updated: Option<String>,
}

/// One per-coin snapshot per tick
///
/// Rows form a time series keyed by `(timestamp, cmc_id)`; the same `cmc_id`
/// recurs across ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinSnapshot {
    /// Collection-tick timestamp (ISO-8601 UTC)
    pub timestamp: DateTime<Utc>,
    /// Stable CoinMarketCap identifier
    pub cmc_id: i64,
    pub name: String,
    pub symbol: String,
    pub slug: String,
    /// Listing rank; 0 when unranked
    pub cmc_rank: i64,
    pub circulating_supply: f64,
    pub total_supply: f64,
    /// `None` means uncapped supply; `Some(0.0)` is a reported zero, which is
    /// a different statement than "no cap"
    pub max_supply: Option<f64>,
    /// Upstream-reported update time for this coin
    pub last_updated: String,
    pub price_usd: f64,
    pub volume_24h: f64,
    pub percent_change_1h: f64,
    pub percent_change_24h: f64,
    pub market_cap: f64,
    pub market_cap_dominance: f64,
}

/// A coin the operator opted into monitoring
///
/// Written by the interactive `track` tool, read in bulk by the collection
/// loop to scope each tick's fetch. The loop never mutates this table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedCoin {
    pub cmc_id: i64,
    pub symbol: String,
    pub name: String,
}

/// Result of a batch write to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Nothing to write; the store was not contacted
    Empty,
    /// The batch was inserted as a whole
    Inserted(usize),
}

impl WriteOutcome {
    /// Number of rows this write produced
    pub fn rows(&self) -> usize {
        match self {
            WriteOutcome::Empty => 0,
            WriteOutcome::Inserted(n) => *n,
        }
    }
}
