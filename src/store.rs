//! Persistent store access
//!
//! Snapshots are appended to Supabase tables over its PostgREST interface.
//! Writes are append-only, one batch per insert: if the store rejects the
//! batch, the whole batch fails as a unit and the loop retries on its next
//! tick. Re-running a tick with the same timestamp produces duplicate rows;
//! there is deliberately no idempotency key or upsert here.

use crate::constants::{COINS_TABLE, GLOBAL_METRICS_TABLE, TRACKED_COINS_TABLE};
use crate::error::StoreError;
use crate::types::{CoinSnapshot, GlobalMetricsSnapshot, TrackedCoin, WriteOutcome};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

/// Trait for the snapshot store
///
/// The collection loop only appends snapshots and reads the tracked-coin
/// registry; `add_tracked_coin` exists for the interactive tracking tool.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Appends one global-metrics row
    async fn write_global(&self, snapshot: &GlobalMetricsSnapshot) -> Result<(), StoreError>;

    /// Appends a batch of coin rows as a single insert
    ///
    /// An empty batch is a no-op reported as [`WriteOutcome::Empty`] without
    /// contacting the store.
    async fn write_coins(&self, snapshots: &[CoinSnapshot]) -> Result<WriteOutcome, StoreError>;

    /// Reads the operator's tracked-coin registry
    async fn tracked_coins(&self) -> Result<Vec<TrackedCoin>, StoreError>;

    /// Registers a coin for tracking (used by the `track` tool only)
    async fn add_tracked_coin(&self, coin: &TrackedCoin) -> Result<(), StoreError>;
}

/// Supabase-backed store
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseStore {
    /// Creates a store client for a Supabase project
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(
                crate::constants::REQUEST_TIMEOUT_SECS,
            ))
            .build()
            .map_err(StoreError::Network)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn insert<T: Serialize + ?Sized>(&self, table: &str, rows: &T) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await
            .map_err(StoreError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for SupabaseStore {
    async fn write_global(&self, snapshot: &GlobalMetricsSnapshot) -> Result<(), StoreError> {
        self.insert(GLOBAL_METRICS_TABLE, snapshot).await?;
        tracing::info!(
            timestamp = %snapshot.timestamp,
            total_market_cap = snapshot.total_market_cap,
            "Stored global metrics snapshot"
        );
        Ok(())
    }

    async fn write_coins(&self, snapshots: &[CoinSnapshot]) -> Result<WriteOutcome, StoreError> {
        if snapshots.is_empty() {
            tracing::debug!("No coin snapshots to store");
            return Ok(WriteOutcome::Empty);
        }

        self.insert(COINS_TABLE, snapshots).await?;
        tracing::info!(count = snapshots.len(), "Stored coin snapshots");
        Ok(WriteOutcome::Inserted(snapshots.len()))
    }

    async fn tracked_coins(&self) -> Result<Vec<TrackedCoin>, StoreError> {
        let response = self
            .client
            .get(self.table_url(TRACKED_COINS_TABLE))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[("select", "cmc_id,symbol,name")])
            .send()
            .await
            .map_err(StoreError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json::<Vec<TrackedCoin>>()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    async fn add_tracked_coin(&self, coin: &TrackedCoin) -> Result<(), StoreError> {
        self.insert(TRACKED_COINS_TABLE, coin).await?;
        tracing::info!(symbol = %coin.symbol, cmc_id = coin.cmc_id, "Registered tracked coin");
        Ok(())
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// In-memory store for exercising the collection loop offline
    #[derive(Default)]
    pub struct MockStore {
        pub registry: Mutex<Vec<TrackedCoin>>,
        pub globals: Mutex<Vec<GlobalMetricsSnapshot>>,
        pub coins: Mutex<Vec<CoinSnapshot>>,
        /// When set, every write fails with a rejected-batch error
        pub fail_writes: Mutex<bool>,
    }

    impl MockStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_registry(registry: Vec<TrackedCoin>) -> Self {
            let store = Self::default();
            *store.registry.lock().unwrap() = registry;
            store
        }

        pub fn fail_writes(&self) {
            *self.fail_writes.lock().unwrap() = true;
        }

        fn rejected() -> StoreError {
            StoreError::Rejected {
                status: 503,
                body: "service unavailable".to_string(),
            }
        }
    }

    #[async_trait]
    impl SnapshotStore for MockStore {
        async fn write_global(
            &self,
            snapshot: &GlobalMetricsSnapshot,
        ) -> Result<(), StoreError> {
            if *self.fail_writes.lock().unwrap() {
                return Err(Self::rejected());
            }
            self.globals.lock().unwrap().push(snapshot.clone());
            Ok(())
        }

        async fn write_coins(
            &self,
            snapshots: &[CoinSnapshot],
        ) -> Result<WriteOutcome, StoreError> {
            if snapshots.is_empty() {
                return Ok(WriteOutcome::Empty);
            }
            if *self.fail_writes.lock().unwrap() {
                return Err(Self::rejected());
            }
            self.coins.lock().unwrap().extend_from_slice(snapshots);
            Ok(WriteOutcome::Inserted(snapshots.len()))
        }

        async fn tracked_coins(&self) -> Result<Vec<TrackedCoin>, StoreError> {
            Ok(self.registry.lock().unwrap().clone())
        }

        async fn add_tracked_coin(&self, coin: &TrackedCoin) -> Result<(), StoreError> {
            self.registry.lock().unwrap().push(coin.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn empty_coin_batch_is_a_no_op() {
        let store = MockStore::new();
        store.fail_writes();
        // Even a failing store accepts an empty batch: nothing is written.
        let outcome = store.write_coins(&[]).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Empty);
        assert_eq!(outcome.rows(), 0);
    }
}
