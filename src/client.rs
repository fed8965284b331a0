//! Upstream market-data API client
//!
//! One synchronous-per-cycle HTTP GET per operation, bounded by a request
//! timeout. No caching and no retries here: a failed call surfaces as a
//! [`ClientError`] and is retried by the collection loop on its next tick.

use crate::constants::{
    CMC_GLOBAL_METRICS_ENDPOINT, CMC_LISTINGS_ENDPOINT, CMC_MAP_ENDPOINT, CMC_QUOTES_ENDPOINT,
    REQUEST_TIMEOUT_SECS, USER_AGENT,
};
use crate::error::ClientError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Trait for the upstream market-data API
///
/// The [`CmcClient`] is the production implementation; tests swap in a mock
/// so collection cycles can run without the network.
#[async_trait]
pub trait MarketDataApi: Send + Sync {
    /// Fetches the global market snapshot
    ///
    /// Returns the full response envelope after the status block has been
    /// checked; callers hand it to the normalizer as-is.
    async fn fetch_global_metrics(&self) -> Result<Value, ClientError>;

    /// Fetches quote payloads for a batch of coin ids, in request order
    ///
    /// An empty id set short-circuits to an empty result without a network
    /// call. Ids the upstream does not know are silently absent from the
    /// output. Oversized batches are not chunked here; the provider's batch
    /// cap is the caller's problem.
    async fn fetch_coin_quotes(&self, ids: &[i64]) -> Result<Vec<Value>, ClientError>;

    /// Fetches the top coins by market cap, in rank order
    async fn fetch_listings(&self, limit: u32) -> Result<Vec<Value>, ClientError>;

    /// Looks up coins matching a ticker symbol, active listings only
    async fn search_coins(&self, symbol: &str) -> Result<Vec<Value>, ClientError>;
}

/// CoinMarketCap API client
pub struct CmcClient {
    client: Client,
    base_url: String,
}

impl CmcClient {
    /// Creates a client for the given base URL and API key
    pub fn new(base_url: impl Into<String>, api_key: &str) -> Result<Self, ClientError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let mut key = reqwest::header::HeaderValue::from_str(api_key)
            .map_err(|e| ClientError::InvalidResponse(format!("Bad API key header: {e}")))?;
        key.set_sensitive(true);
        headers.insert("X-CMC_PRO_API_KEY", key);
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(ClientError::Network)?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Issues one GET and returns the envelope after checking both the HTTP
    /// status and the embedded `status.error_code`.
    async fn get_envelope(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Value, ClientError> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!(url = %url, "Requesting upstream API");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(ClientError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let envelope: Value = response.json().await.map_err(ClientError::Network)?;
        check_status(&envelope)?;
        Ok(envelope)
    }
}

/// Upstream reports application errors in the envelope even on HTTP 200.
fn check_status(envelope: &Value) -> Result<(), ClientError> {
    let code = envelope
        .pointer("/status/error_code")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    if code != 0 {
        let message = envelope
            .pointer("/status/error_message")
            .and_then(Value::as_str)
            .unwrap_or("unknown upstream error")
            .to_string();
        return Err(ClientError::Api { code, message });
    }
    Ok(())
}

#[async_trait]
impl MarketDataApi for CmcClient {
    async fn fetch_global_metrics(&self) -> Result<Value, ClientError> {
        self.get_envelope(
            CMC_GLOBAL_METRICS_ENDPOINT,
            &[("convert", "USD".to_string())],
        )
        .await
    }

    async fn fetch_coin_quotes(&self, ids: &[i64]) -> Result<Vec<Value>, ClientError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let id_list = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let envelope = self
            .get_envelope(
                CMC_QUOTES_ENDPOINT,
                &[("id", id_list), ("convert", "USD".to_string())],
            )
            .await?;

        let data = envelope
            .get("data")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                ClientError::InvalidResponse("quotes envelope missing `data` object".to_string())
            })?;

        // The upstream keys the payload by id string; rebuild request order.
        let coins = ids
            .iter()
            .filter_map(|id| data.get(&id.to_string()).cloned())
            .collect::<Vec<_>>();
        tracing::debug!(
            requested = ids.len(),
            returned = coins.len(),
            "Fetched coin quotes"
        );
        Ok(coins)
    }

    async fn fetch_listings(&self, limit: u32) -> Result<Vec<Value>, ClientError> {
        let envelope = self
            .get_envelope(
                CMC_LISTINGS_ENDPOINT,
                &[
                    ("start", "1".to_string()),
                    ("limit", limit.to_string()),
                    ("convert", "USD".to_string()),
                    ("sort", "market_cap".to_string()),
                    ("sort_dir", "desc".to_string()),
                ],
            )
            .await?;

        envelope
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| {
                ClientError::InvalidResponse("listings envelope missing `data` array".to_string())
            })
    }

    async fn search_coins(&self, symbol: &str) -> Result<Vec<Value>, ClientError> {
        let envelope = self
            .get_envelope(
                CMC_MAP_ENDPOINT,
                &[("symbol", symbol.to_uppercase())],
            )
            .await?;

        let coins = envelope
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| {
                ClientError::InvalidResponse("map envelope missing `data` array".to_string())
            })?;

        Ok(coins
            .into_iter()
            .filter(|c| c.get("is_active").and_then(Value::as_i64) == Some(1))
            .collect())
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Canned-response client for exercising the collection loop offline
    #[derive(Default)]
    pub struct MockApi {
        pub global: Mutex<Option<Result<Value, ClientError>>>,
        pub quotes: Mutex<Option<Result<Vec<Value>, ClientError>>>,
        pub listings: Mutex<Option<Result<Vec<Value>, ClientError>>>,
        pub calls: Mutex<usize>,
    }

    impl MockApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_global(&self, envelope: Value) {
            *self.global.lock().unwrap() = Some(Ok(envelope));
        }

        pub fn set_quotes(&self, coins: Vec<Value>) {
            *self.quotes.lock().unwrap() = Some(Ok(coins));
        }

        pub fn set_listings(&self, coins: Vec<Value>) {
            *self.listings.lock().unwrap() = Some(Ok(coins));
        }

        /// Total network-equivalent calls made against the mock
        pub fn call_count(&self) -> usize {
            *self.calls.lock().unwrap()
        }

        fn take<T>(slot: &Mutex<Option<Result<T, ClientError>>>) -> Result<T, ClientError> {
            slot.lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(ClientError::InvalidResponse("no canned response".into())))
        }
    }

    #[async_trait]
    impl MarketDataApi for MockApi {
        async fn fetch_global_metrics(&self) -> Result<Value, ClientError> {
            *self.calls.lock().unwrap() += 1;
            Self::take(&self.global)
        }

        async fn fetch_coin_quotes(&self, ids: &[i64]) -> Result<Vec<Value>, ClientError> {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            *self.calls.lock().unwrap() += 1;
            Self::take(&self.quotes)
        }

        async fn fetch_listings(&self, _limit: u32) -> Result<Vec<Value>, ClientError> {
            *self.calls.lock().unwrap() += 1;
            Self::take(&self.listings)
        }

        async fn search_coins(&self, _symbol: &str) -> Result<Vec<Value>, ClientError> {
            *self.calls.lock().unwrap() += 1;
            Err(ClientError::InvalidResponse("not mocked".into()))
        }
    }
}
