use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use common::{MarketDataProvider, Result};

/// Result of intersecting the watchlist with the exchange listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub valid: usize,
    /// Watchlist symbols the exchange does not list, in watchlist order.
    pub missing: Vec<String>,
}

/// The instruments eligible for polling.
///
/// Readers take an `Arc` snapshot and iterate it without holding the lock;
/// a refresh publishes a new snapshot in one swap, so no reader ever sees a
/// half-updated set.
pub struct SymbolUniverse {
    watchlist: Arc<[String]>,
    current: RwLock<Arc<[String]>>,
}

impl SymbolUniverse {
    /// Seeded with the full watchlist until the first refresh succeeds.
    pub fn new(watchlist: Vec<String>) -> Self {
        let watchlist: Arc<[String]> = watchlist.into();
        Self {
            current: RwLock::new(watchlist.clone()),
            watchlist,
        }
    }

    pub async fn snapshot(&self) -> Arc<[String]> {
        self.current.read().await.clone()
    }

    pub fn watchlist(&self) -> &[String] {
        &self.watchlist
    }

    async fn replace(&self, symbols: Vec<String>) {
        *self.current.write().await = symbols.into();
    }

    /// Re-validate the watchlist against the exchange and publish the result.
    /// On error the previous snapshot stays in place.
    pub async fn refresh(&self, provider: &dyn MarketDataProvider) -> Result<RefreshReport> {
        let listed: HashSet<String> = provider.listed_symbols().await?;

        let (valid, missing): (Vec<String>, Vec<String>) = self
            .watchlist
            .iter()
            .cloned()
            .partition(|s| listed.contains(s));

        let report = RefreshReport {
            valid: valid.len(),
            missing,
        };
        self.replace(valid).await;

        info!(valid = report.valid, missing = report.missing.len(), "Symbol universe refreshed");
        if !report.missing.is_empty() {
            warn!(missing = ?report.missing, "Watchlist symbols not listed on the exchange");
        }
        Ok(report)
    }

    /// Refresh forever on `interval`. The first refresh is expected to have
    /// happened at startup, so this waits one full interval before starting.
    /// Call from `tokio::spawn`.
    pub async fn run_refresh(self: Arc<Self>, provider: Arc<dyn MarketDataProvider>, interval: Duration) {
        info!(interval_secs = interval.as_secs(), "Universe refresh task running");
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.refresh(provider.as_ref()).await {
                error!(error = %e, "Failed to refresh symbol universe");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockMarket;

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn starts_with_the_full_watchlist() {
        let universe = SymbolUniverse::new(symbols(&["BTCUSDT", "ETHUSDT"]));
        assert_eq!(&*universe.snapshot().await, &symbols(&["BTCUSDT", "ETHUSDT"])[..]);
    }

    #[tokio::test]
    async fn refresh_keeps_listed_symbols_in_watchlist_order() {
        let market = MockMarket::new();
        market.list(&["SOLUSDT", "BTCUSDT", "XRPUSDT"]).await;
        let universe = SymbolUniverse::new(symbols(&["BTCUSDT", "LUNAUSDT", "SOLUSDT"]));

        let report = universe.refresh(&market).await.unwrap();

        assert_eq!(report.valid, 2);
        assert_eq!(report.missing, symbols(&["LUNAUSDT"]));
        assert_eq!(&*universe.snapshot().await, &symbols(&["BTCUSDT", "SOLUSDT"])[..]);
    }

    #[tokio::test]
    async fn old_snapshot_survives_a_swap() {
        let market = MockMarket::new();
        market.list(&["BTCUSDT"]).await;
        let universe = SymbolUniverse::new(symbols(&["BTCUSDT", "ETHUSDT"]));

        let before = universe.snapshot().await;
        universe.refresh(&market).await.unwrap();

        assert_eq!(before.len(), 2);
        assert_eq!(universe.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let market = MockMarket::new();
        market.fail_listing(common::Error::Network("down".into())).await;
        let universe = SymbolUniverse::new(symbols(&["BTCUSDT", "ETHUSDT"]));

        assert!(universe.refresh(&market).await.is_err());
        assert_eq!(universe.snapshot().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_loop_waits_an_interval_and_survives_failures() {
        let market = Arc::new(MockMarket::new());
        market.list(&["BTCUSDT"]).await;
        let universe = Arc::new(SymbolUniverse::new(symbols(&["BTCUSDT", "ETHUSDT"])));
        let provider: Arc<dyn MarketDataProvider> = market.clone();
        let hour = Duration::from_secs(3_600);

        let handle = tokio::spawn(universe.clone().run_refresh(provider, hour));

        // No refresh on spawn.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(universe.snapshot().await.len(), 2);

        tokio::time::sleep(hour).await;
        assert_eq!(&*universe.snapshot().await, &symbols(&["BTCUSDT"])[..]);

        // Second refresh fails; the loop keeps the snapshot and carries on.
        market.fail_listing(common::Error::Network("down".into())).await;
        market.list(&["BTCUSDT", "ETHUSDT"]).await;
        tokio::time::sleep(hour).await;
        assert_eq!(universe.snapshot().await.len(), 1);

        tokio::time::sleep(hour).await;
        assert_eq!(universe.snapshot().await.len(), 2);
        handle.abort();
    }
}

