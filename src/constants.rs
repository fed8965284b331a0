//! Constants for the market data collector
//!
//! Endpoints and fixed limits live here; anything an operator may want to
//! tune at runtime (interval, backoff, credentials) lives in [`crate::config`].

/// How often a collection cycle runs (in seconds)
pub const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Sleep applied after a failed cycle before the next attempt (in seconds)
pub const DEFAULT_ERROR_BACKOFF_SECS: u64 = 60;

/// HTTP request timeout for upstream API calls (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// How many coins the top-listings source fetches per cycle
pub const DEFAULT_TOP_LIMIT: u32 = 100;

/// How many coins the report summary includes
pub const REPORT_TOP_COINS: usize = 10;

/// CoinMarketCap API base URL
pub const CMC_API_URL: &str = "https://pro-api.coinmarketcap.com";

/// Global metrics endpoint (v1)
pub const CMC_GLOBAL_METRICS_ENDPOINT: &str = "/v1/global-metrics/quotes/latest";

/// Quotes-by-id endpoint (v2)
pub const CMC_QUOTES_ENDPOINT: &str = "/v2/cryptocurrency/quotes/latest";

/// Ranked listings endpoint (v1)
pub const CMC_LISTINGS_ENDPOINT: &str = "/v1/cryptocurrency/listings/latest";

/// Symbol-to-id map endpoint (v1), used by the tracking tool
pub const CMC_MAP_ENDPOINT: &str = "/v1/cryptocurrency/map";

/// OpenAI-compatible chat completions endpoint for the report generator
pub const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Model used for narrative reports
pub const REPORT_MODEL: &str = "gpt-4-turbo-preview";

/// Supabase table receiving global market snapshots
pub const GLOBAL_METRICS_TABLE: &str = "global_metrics";

/// Supabase table receiving per-coin snapshots
pub const COINS_TABLE: &str = "coins";

/// Supabase table holding the operator's tracked-coin registry
pub const TRACKED_COINS_TABLE: &str = "tracked_coins";

/// User agent for HTTP requests
pub const USER_AGENT: &str = "cmc-collector/0.1.0";
