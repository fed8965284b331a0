//! Coin-id source strategies
//!
//! The collection loop is parameterized by where its coin ids come from:
//! the operator's tracked-coin registry, or the current top listings by
//! market cap. Both are interchangeable behind [`CoinSource`]. An empty id
//! set is a valid answer, not an error; the loop skips the cycle on it.

use crate::client::MarketDataApi;
use crate::error::SourceError;
use crate::store::SnapshotStore;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Produces the set of coin ids to fetch this tick
#[async_trait]
pub trait CoinSource: Send + Sync {
    /// Resolves the ids for the current cycle
    async fn coin_ids(&self) -> Result<Vec<i64>, SourceError>;

    /// Short name for log lines
    fn name(&self) -> &'static str;
}

/// Source backed by the `tracked_coins` registry
pub struct TrackedSource {
    store: Arc<dyn SnapshotStore>,
}

impl TrackedSource {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CoinSource for TrackedSource {
    async fn coin_ids(&self) -> Result<Vec<i64>, SourceError> {
        let registry = self.store.tracked_coins().await?;
        for coin in &registry {
            tracing::debug!(symbol = %coin.symbol, cmc_id = coin.cmc_id, "Tracked coin");
        }
        Ok(registry.into_iter().map(|c| c.cmc_id).collect())
    }

    fn name(&self) -> &'static str {
        "tracked"
    }
}

/// Source that follows the top coins by market cap
pub struct TopSource {
    client: Arc<dyn MarketDataApi>,
    limit: u32,
}

impl TopSource {
    pub fn new(client: Arc<dyn MarketDataApi>, limit: u32) -> Self {
        Self { client, limit }
    }
}

#[async_trait]
impl CoinSource for TopSource {
    async fn coin_ids(&self) -> Result<Vec<i64>, SourceError> {
        let listings = self.client.fetch_listings(self.limit).await?;
        // Listings arrive rank-ordered; keep that order for the quote batch.
        Ok(listings
            .iter()
            .filter_map(|c| c.get("id").and_then(Value::as_i64))
            .collect())
    }

    fn name(&self) -> &'static str {
        "top"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockApi;
    use crate::store::mock::MockStore;
    use crate::types::TrackedCoin;
    use serde_json::json;

    #[tokio::test]
    async fn tracked_source_reads_registry_ids() {
        let store = Arc::new(MockStore::with_registry(vec![
            TrackedCoin {
                cmc_id: 1,
                symbol: "BTC".into(),
                name: "Bitcoin".into(),
            },
            TrackedCoin {
                cmc_id: 1027,
                symbol: "ETH".into(),
                name: "Ethereum".into(),
            },
        ]));
        let source = TrackedSource::new(store);
        assert_eq!(source.coin_ids().await.unwrap(), vec![1, 1027]);
    }

    #[tokio::test]
    async fn empty_registry_yields_empty_ids() {
        let source = TrackedSource::new(Arc::new(MockStore::new()));
        assert!(source.coin_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn top_source_extracts_ids_in_rank_order() {
        let api = Arc::new(MockApi::new());
        api.set_listings(vec![
            json!({ "id": 1, "cmc_rank": 1 }),
            json!({ "id": 1027, "cmc_rank": 2 }),
            json!({ "cmc_rank": 3 }),
        ]);
        let source = TopSource::new(api, 100);
        // An entry without an id contributes nothing.
        assert_eq!(source.coin_ids().await.unwrap(), vec![1, 1027]);
    }
}
