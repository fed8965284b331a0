//! Environment-driven configuration
//!
//! The three credentials are required; a missing one is a fatal startup
//! condition reported with every missing name at once, never retried.
//! Interval and backoff have defaults but stay operator-tunable.

use crate::constants::{
    CMC_API_URL, DEFAULT_ERROR_BACKOFF_SECS, DEFAULT_INTERVAL_SECS, DEFAULT_TOP_LIMIT,
};
use crate::error::ConfigError;
use std::time::Duration;

/// Settings for the collector process
#[derive(Debug, Clone)]
pub struct Config {
    /// Supabase project URL (store endpoint)
    pub supabase_url: String,
    /// Supabase service key (store credential)
    pub supabase_key: String,
    /// CoinMarketCap API key
    pub cmc_api_key: String,
    /// Upstream API base URL; overridable for tests and proxies
    pub cmc_base_url: String,
    /// Wall-clock interval between collection cycles
    pub interval: Duration,
    /// Sleep applied after a failed cycle
    pub error_backoff: Duration,
    /// Coin count for the top-listings source
    pub top_limit: u32,
}

impl Config {
    /// Reads configuration from the process environment
    ///
    /// Required: `SUPABASE_URL`, `SUPABASE_KEY`, `CMC_API_KEY`.
    /// Optional: `CMC_BASE_URL`, `COLLECT_INTERVAL_SECS`,
    /// `ERROR_BACKOFF_SECS`, `TOP_LIMIT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let supabase_url = require("SUPABASE_URL", &mut missing);
        let supabase_key = require("SUPABASE_KEY", &mut missing);
        let cmc_api_key = require("CMC_API_KEY", &mut missing);

        if !missing.is_empty() {
            return Err(ConfigError::MissingVars(missing));
        }

        Ok(Self {
            supabase_url,
            supabase_key,
            cmc_api_key,
            cmc_base_url: std::env::var("CMC_BASE_URL")
                .unwrap_or_else(|_| CMC_API_URL.to_string()),
            interval: Duration::from_secs(parse_secs(
                "COLLECT_INTERVAL_SECS",
                DEFAULT_INTERVAL_SECS,
            )?),
            error_backoff: Duration::from_secs(parse_secs(
                "ERROR_BACKOFF_SECS",
                DEFAULT_ERROR_BACKOFF_SECS,
            )?),
            top_limit: parse_secs("TOP_LIMIT", u64::from(DEFAULT_TOP_LIMIT))? as u32,
        })
    }
}

fn require(name: &str, missing: &mut Vec<String>) -> String {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => v,
        _ => {
            missing.push(name.to_string());
            String::new()
        }
    }
}

fn parse_secs(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("expected an integer, got {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}
