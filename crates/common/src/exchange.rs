use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Bar, Result, Timeframe};

/// Read-only view of the exchange used by the scanner.
///
/// `BinanceFuturesClient` implements this against the USDT-M futures REST API.
/// Tests substitute an in-memory market.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Last traded price for a symbol.
    async fn current_price(&self, symbol: &str) -> Result<f64>;

    /// The most recent `count` bars, oldest first. The last one is still forming.
    async fn recent_bars(&self, symbol: &str, timeframe: &Timeframe, count: usize)
        -> Result<Vec<Bar>>;

    /// Authoritative exchange clock.
    async fn server_time(&self) -> Result<DateTime<Utc>>;

    /// Every symbol currently open for trading.
    async fn listed_symbols(&self) -> Result<HashSet<String>>;
}
