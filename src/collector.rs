//! Collection loop
//!
//! One cycle walks FETCHING -> NORMALIZING -> WRITING and then sleeps.
//! Any stage failure is logged and ends the cycle early; the loop itself
//! never exits on a failed cycle, it just sleeps the (shorter) error
//! backoff instead of the regular interval. The only clean exit is the
//! shutdown signal, observed at the sleep boundary.

use crate::client::MarketDataApi;
use crate::constants::{DEFAULT_ERROR_BACKOFF_SECS, DEFAULT_INTERVAL_SECS};
use crate::normalize::{normalize_coins, normalize_global};
use crate::source::CoinSource;
use crate::store::SnapshotStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Loop pacing configuration
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Wall-clock interval between cycles
    pub interval: Duration,
    /// Sleep applied after a failed cycle
    pub error_backoff: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            error_backoff: Duration::from_secs(DEFAULT_ERROR_BACKOFF_SECS),
        }
    }
}

/// Pipeline stage, used to label failures in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Normalizing,
    Writing,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Fetching => write!(f, "fetching"),
            Stage::Normalizing => write!(f, "normalizing"),
            Stage::Writing => write!(f, "writing"),
        }
    }
}

/// What one cycle accomplished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Snapshots were collected and written
    Collected {
        /// Coin rows written
        coins: usize,
        /// Malformed coin payloads dropped from the batch
        skipped: usize,
    },
    /// The id source produced nothing; all stages were skipped
    Idle,
    /// At least one stage failed; the cycle was abandoned there
    Failed,
}

/// Market data collector
///
/// Owns the client, store, and id-source strategy for one collection loop.
/// The tracked-coins and top-coins collectors are the same loop with a
/// different [`CoinSource`].
pub struct Collector {
    client: Arc<dyn MarketDataApi>,
    store: Arc<dyn SnapshotStore>,
    source: Box<dyn CoinSource>,
    config: CollectorConfig,
}

impl Collector {
    pub fn new(
        client: Arc<dyn MarketDataApi>,
        store: Arc<dyn SnapshotStore>,
        source: Box<dyn CoinSource>,
        config: CollectorConfig,
    ) -> Self {
        Self {
            client,
            store,
            source,
            config,
        }
    }

    /// Runs collection cycles until `shutdown` flips to true
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            source = self.source.name(),
            interval_secs = self.config.interval.as_secs(),
            error_backoff_secs = self.config.error_backoff.as_secs(),
            "Starting collection loop"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let outcome = self.run_cycle().await;
            let delay = self.delay_for(outcome);
            tracing::info!(
                outcome = ?outcome,
                sleep_secs = delay.as_secs(),
                "Cycle complete, sleeping"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Collection loop stopped");
    }

    /// How long to sleep after a cycle with the given outcome
    pub fn delay_for(&self, outcome: CycleOutcome) -> Duration {
        match outcome {
            CycleOutcome::Failed => self.config.error_backoff,
            _ => self.config.interval,
        }
    }

    /// Executes one collection cycle
    ///
    /// Never returns an error: every failure is logged here with its stage
    /// and folded into the outcome, so a bad cycle cannot take the loop down.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let timestamp = Utc::now();
        tracing::info!(source = self.source.name(), %timestamp, "Starting collection cycle");

        let ids = match self.source.coin_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(stage = %Stage::Fetching, error = %e, "Failed to resolve coin ids");
                return CycleOutcome::Failed;
            }
        };

        if ids.is_empty() {
            // Not an error: an empty registry just means nothing to do yet.
            tracing::warn!(source = self.source.name(), "No coins to fetch, skipping cycle");
            return CycleOutcome::Idle;
        }

        // The global and coin halves are independent; a failure in one is
        // logged without aborting the other, and either failure marks the
        // whole cycle failed for backoff purposes.
        let global_ok = self.collect_global(timestamp).await;
        let coins_result = self.collect_coins(&ids, timestamp).await;

        match (global_ok, coins_result) {
            (true, Some((coins, skipped))) => CycleOutcome::Collected { coins, skipped },
            _ => CycleOutcome::Failed,
        }
    }

    async fn collect_global(&self, timestamp: chrono::DateTime<Utc>) -> bool {
        let envelope = match self.client.fetch_global_metrics().await {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(stage = %Stage::Fetching, error = %e, "Global metrics fetch failed");
                return false;
            }
        };

        let snapshot = match normalize_global(&envelope, timestamp) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(stage = %Stage::Normalizing, error = %e, "Global metrics payload malformed");
                return false;
            }
        };

        if let Err(e) = self.store.write_global(&snapshot).await {
            tracing::error!(stage = %Stage::Writing, error = %e, "Global metrics write failed");
            return false;
        }
        true
    }

    async fn collect_coins(
        &self,
        ids: &[i64],
        timestamp: chrono::DateTime<Utc>,
    ) -> Option<(usize, usize)> {
        let raw = match self.client.fetch_coin_quotes(ids).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(stage = %Stage::Fetching, error = %e, "Coin quotes fetch failed");
                return None;
            }
        };

        let (snapshots, skipped) = normalize_coins(&raw, timestamp);
        if skipped > 0 {
            tracing::warn!(skipped, "Dropped malformed coin payloads from batch");
        }

        match self.store.write_coins(&snapshots).await {
            Ok(outcome) => Some((outcome.rows(), skipped)),
            Err(e) => {
                tracing::error!(stage = %Stage::Writing, error = %e, "Coin batch write failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockApi;
    use crate::store::mock::MockStore;
    use crate::types::TrackedCoin;
    use serde_json::{json, Value};

    fn tracked(cmc_id: i64, symbol: &str) -> TrackedCoin {
        TrackedCoin {
            cmc_id,
            symbol: symbol.into(),
            name: symbol.into(),
        }
    }

    fn global_envelope() -> Value {
        json!({
            "status": { "error_code": 0 },
            "data": {
                "btc_dominance": 52.3,
                "eth_dominance": 17.1,
                "quote": { "USD": {
                    "total_market_cap": 2.1e12,
                    "total_volume_24h": 8.5e10
                }},
                "active_cryptocurrencies": 10234
            }
        })
    }

    fn quote(id: i64, price: f64) -> Value {
        json!({
            "id": id,
            "name": format!("coin-{id}"),
            "symbol": format!("C{id}"),
            "slug": format!("coin-{id}"),
            "quote": { "USD": {
                "price": price,
                "volume_24h": 1.0e9,
                "market_cap": 1.0e10
            }}
        })
    }

    fn collector(api: Arc<MockApi>, store: Arc<MockStore>) -> Collector {
        let source = Box::new(crate::source::TrackedSource::new(store.clone()));
        Collector::new(api, store, source, CollectorConfig::default())
    }

    #[tokio::test]
    async fn empty_registry_skips_all_stages() {
        let api = Arc::new(MockApi::new());
        let store = Arc::new(MockStore::new());
        let c = collector(api.clone(), store.clone());

        assert_eq!(c.run_cycle().await, CycleOutcome::Idle);
        // The market data client was never invoked.
        assert_eq!(api.call_count(), 0);
        assert!(store.globals.lock().unwrap().is_empty());
        assert!(store.coins.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn full_cycle_writes_both_tables() {
        let api = Arc::new(MockApi::new());
        api.set_global(global_envelope());
        api.set_quotes(vec![quote(1, 42000.0), quote(1027, 2200.0)]);
        let store = Arc::new(MockStore::with_registry(vec![
            tracked(1, "BTC"),
            tracked(1027, "ETH"),
        ]));
        let c = collector(api, store.clone());

        assert_eq!(
            c.run_cycle().await,
            CycleOutcome::Collected { coins: 2, skipped: 0 }
        );
        assert_eq!(store.globals.lock().unwrap().len(), 1);
        assert_eq!(store.globals.lock().unwrap()[0].btc_dominance, 52.3);
        let coins = store.coins.lock().unwrap();
        assert_eq!(coins.len(), 2);
        assert_eq!(coins[0].cmc_id, 1);
        assert_eq!(coins[1].cmc_id, 1027);
    }

    #[tokio::test]
    async fn malformed_coin_is_dropped_not_fatal() {
        let api = Arc::new(MockApi::new());
        api.set_global(global_envelope());
        let mut bad = quote(1027, 2200.0);
        bad["quote"]["USD"].as_object_mut().unwrap().remove("market_cap");
        api.set_quotes(vec![quote(1, 42000.0), bad]);
        let store = Arc::new(MockStore::with_registry(vec![
            tracked(1, "BTC"),
            tracked(1027, "ETH"),
        ]));
        let c = collector(api, store.clone());

        assert_eq!(
            c.run_cycle().await,
            CycleOutcome::Collected { coins: 1, skipped: 1 }
        );
        assert_eq!(store.coins.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn store_failure_is_contained_and_backs_off() {
        let api = Arc::new(MockApi::new());
        api.set_global(global_envelope());
        api.set_quotes(vec![quote(1, 42000.0)]);
        let store = Arc::new(MockStore::with_registry(vec![tracked(1, "BTC")]));
        store.fail_writes();
        let c = collector(api, store);

        let outcome = c.run_cycle().await;
        assert_eq!(outcome, CycleOutcome::Failed);
        // A failed cycle sleeps the shorter backoff, not the interval.
        assert_eq!(c.delay_for(outcome), c.config.error_backoff);
        assert_eq!(
            c.delay_for(CycleOutcome::Idle),
            c.config.interval
        );
    }

    #[tokio::test]
    async fn fetch_failure_fails_the_cycle() {
        let api = Arc::new(MockApi::new());
        // No canned responses: both halves fail at the fetch stage.
        let store = Arc::new(MockStore::with_registry(vec![tracked(1, "BTC")]));
        let c = collector(api, store.clone());

        assert_eq!(c.run_cycle().await, CycleOutcome::Failed);
        assert!(store.coins.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn shutdown_signal_stops_the_loop() {
        let api = Arc::new(MockApi::new());
        let store = Arc::new(MockStore::new());
        let c = collector(api, store);
        let (tx, rx) = watch::channel(true);

        // Pre-signalled shutdown: run() must return promptly.
        c.run(rx).await;
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_keeps_ticking_after_failures() {
        let api = Arc::new(MockApi::new());
        let store = Arc::new(MockStore::with_registry(vec![tracked(1, "BTC")]));
        let c = Arc::new(collector(api.clone(), store));
        let (tx, rx) = watch::channel(false);

        let handle = {
            let c = c.clone();
            tokio::spawn(async move { c.run(rx).await })
        };

        // Paused time auto-advances through the sleeps; give the loop a few
        // failed cycles, then stop it.
        tokio::time::sleep(c.config.error_backoff * 3).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        // Each failed cycle makes one (failing) quotes call plus one global
        // call; more than one cycle proves the loop survived the failures.
        assert!(api.call_count() >= 4, "call_count = {}", api.call_count());
    }
}
