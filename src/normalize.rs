//! Record normalization
//!
//! Turns raw upstream payloads into fixed-shape snapshots. Nullable numerics
//! are coerced through one shared helper so null-handling cannot drift
//! between the global and per-coin paths. A malformed coin entry is dropped
//! and counted; it never aborts the rest of the batch.

use crate::error::NormalizeError;
use crate::types::{CoinSnapshot, GlobalMetricsSnapshot};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Coerces an optional JSON number to `f64`, falling back to `default` when
/// the value is absent, null, non-numeric, or non-finite.
fn num_or(value: Option<&Value>, default: f64) -> f64 {
    value
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// Integer counterpart of [`num_or`].
fn int_or(value: Option<&Value>, default: i64) -> i64 {
    value.and_then(Value::as_i64).unwrap_or(default)
}

/// A field that must be present and numeric for the record to survive.
fn required_num(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

fn str_or_empty(value: Option<&Value>) -> String {
    value.and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Normalizes a global-metrics envelope into one snapshot row
///
/// Fails only when the envelope itself is malformed (no `data` payload);
/// individual missing fields default to 0 per the schema.
pub fn normalize_global(
    envelope: &Value,
    timestamp: DateTime<Utc>,
) -> Result<GlobalMetricsSnapshot, NormalizeError> {
    let data = envelope.get("data").ok_or(NormalizeError::MissingData)?;
    let usd = data.pointer("/quote/USD");

    Ok(GlobalMetricsSnapshot {
        timestamp,
        btc_dominance: num_or(data.get("btc_dominance"), 0.0),
        eth_dominance: num_or(data.get("eth_dominance"), 0.0),
        total_market_cap: num_or(usd.and_then(|q| q.get("total_market_cap")), 0.0),
        total_volume_24h: num_or(usd.and_then(|q| q.get("total_volume_24h")), 0.0),
        active_cryptocurrencies: int_or(data.get("active_cryptocurrencies"), 0),
        active_market_pairs: int_or(data.get("active_market_pairs"), 0),
        active_exchanges: int_or(data.get("active_exchanges"), 0),
        defi_volume_24h: num_or(data.get("defi_volume_24h"), 0.0),
        defi_market_cap: num_or(data.get("defi_market_cap"), 0.0),
        stablecoin_volume_24h: num_or(data.get("stablecoin_volume_24h"), 0.0),
        stablecoin_market_cap: num_or(data.get("stablecoin_market_cap"), 0.0),
        last_updated: data
            .get("last_updated")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Normalizes a batch of raw coin payloads, preserving input order
///
/// Entries missing any of {id, price, volume_24h, market_cap} are dropped
/// and counted in the returned skip total. This never fails: one bad coin
/// must not discard the rest of the batch.
pub fn normalize_coins(
    raw: &[Value],
    timestamp: DateTime<Utc>,
) -> (Vec<CoinSnapshot>, usize) {
    let mut snapshots = Vec::with_capacity(raw.len());
    let mut skipped = 0usize;

    for coin in raw {
        match normalize_coin(coin, timestamp) {
            Some(snapshot) => snapshots.push(snapshot),
            None => {
                skipped += 1;
                tracing::warn!(
                    coin = coin
                        .get("name")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or("unknown"),
                    "Dropping coin payload with missing required fields"
                );
            }
        }
    }

    (snapshots, skipped)
}

fn normalize_coin(coin: &Value, timestamp: DateTime<Utc>) -> Option<CoinSnapshot> {
    let cmc_id = coin.get("id").and_then(Value::as_i64)?;
    let quote = coin.pointer("/quote/USD")?;
    let price_usd = required_num(quote.get("price"))?;
    let volume_24h = required_num(quote.get("volume_24h"))?;
    let market_cap = required_num(quote.get("market_cap"))?;

    // null means uncapped; a reported zero stays 0.0.
    let max_supply = match coin.get("max_supply") {
        None => None,
        Some(Value::Null) => None,
        Some(v) => v.as_f64().filter(|m| m.is_finite()),
    };

    Some(CoinSnapshot {
        timestamp,
        cmc_id,
        name: str_or_empty(coin.get("name")),
        symbol: str_or_empty(coin.get("symbol")),
        slug: str_or_empty(coin.get("slug")),
        cmc_rank: int_or(coin.get("cmc_rank"), 0),
        circulating_supply: num_or(coin.get("circulating_supply"), 0.0),
        total_supply: num_or(coin.get("total_supply"), 0.0),
        max_supply,
        last_updated: str_or_empty(coin.get("last_updated")),
        price_usd,
        volume_24h,
        percent_change_1h: num_or(quote.get("percent_change_1h"), 0.0),
        percent_change_24h: num_or(quote.get("percent_change_24h"), 0.0),
        market_cap,
        market_cap_dominance: num_or(quote.get("market_cap_dominance"), 0.0),
    })
}
