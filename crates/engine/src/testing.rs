//! In-memory market used by the engine's unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Mutex;

use common::{Bar, Error, MarketDataProvider, Result, Timeframe};

#[derive(Default)]
struct State {
    prices: HashMap<String, f64>,
    bars: HashMap<(String, String), Vec<Bar>>,
    server_time: Option<DateTime<Utc>>,
    /// Exchange clock that advances with tokio time from the given instant.
    clock: Option<(DateTime<Utc>, tokio::time::Instant)>,
    server_time_latency: Duration,
    listed: HashSet<String>,
    listing_error: Option<Error>,
    server_time_error: Option<Error>,
    /// Errors returned by `current_price`, consumed front to back.
    price_errors: HashMap<String, VecDeque<Error>>,
    delays: HashMap<String, Duration>,
    panics: HashSet<String>,
}

pub struct MockMarket {
    state: Mutex<State>,
    price_calls: AtomicUsize,
    server_time_calls: AtomicUsize,
}

impl MockMarket {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            price_calls: AtomicUsize::new(0),
            server_time_calls: AtomicUsize::new(0),
        }
    }

    pub async fn set_time(&self, now: DateTime<Utc>) {
        self.state.lock().await.server_time = Some(now);
    }

    /// Server time starts at `origin` now and moves with tokio time. Each
    /// read answers after `latency`, stamped when the answer is produced.
    pub async fn follow_clock(&self, origin: DateTime<Utc>, latency: Duration) {
        let mut state = self.state.lock().await;
        state.clock = Some((origin, tokio::time::Instant::now()));
        state.server_time_latency = latency;
    }

    pub async fn set_price(&self, symbol: &str, price: f64) {
        self.state.lock().await.prices.insert(symbol.into(), price);
    }

    pub async fn set_bars(&self, symbol: &str, timeframe: &str, bars: Vec<Bar>) {
        self.state
            .lock()
            .await
            .bars
            .insert((symbol.into(), timeframe.into()), bars);
    }

    pub async fn list(&self, symbols: &[&str]) {
        self.state.lock().await.listed = symbols.iter().map(|s| s.to_string()).collect();
    }

    pub async fn fail_listing(&self, error: Error) {
        self.state.lock().await.listing_error = Some(error);
    }

    pub async fn fail_server_time(&self, error: Error) {
        self.state.lock().await.server_time_error = Some(error);
    }

    pub async fn fail_price(&self, symbol: &str, error: Error) {
        self.state
            .lock()
            .await
            .price_errors
            .entry(symbol.into())
            .or_default()
            .push_back(error);
    }

    pub async fn delay(&self, symbol: &str, delay: Duration) {
        self.state.lock().await.delays.insert(symbol.into(), delay);
    }

    pub async fn panic_on(&self, symbol: &str) {
        self.state.lock().await.panics.insert(symbol.into());
    }

    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }

    pub fn server_time_calls(&self) -> usize {
        self.server_time_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for MockMarket {
    async fn current_price(&self, symbol: &str) -> Result<f64> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        let delay = {
            let mut state = self.state.lock().await;
            if state.panics.contains(symbol) {
                panic!("mock market asked to panic for {symbol}");
            }
            if let Some(err) = state.price_errors.get_mut(symbol).and_then(|q| q.pop_front()) {
                return Err(err);
            }
            state.delays.get(symbol).copied()
        };
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        self.state
            .lock()
            .await
            .prices
            .get(symbol)
            .copied()
            .ok_or_else(|| Error::DegradedData(format!("no price for {symbol}")))
    }

    async fn recent_bars(
        &self,
        symbol: &str,
        timeframe: &Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>> {
        let state = self.state.lock().await;
        let bars = state
            .bars
            .get(&(symbol.to_string(), timeframe.name.clone()))
            .cloned()
            .unwrap_or_default();
        let skip = bars.len().saturating_sub(count);
        Ok(bars.into_iter().skip(skip).collect())
    }

    async fn server_time(&self) -> Result<DateTime<Utc>> {
        self.server_time_calls.fetch_add(1, Ordering::SeqCst);
        let (fixed, clock, latency) = {
            let mut state = self.state.lock().await;
            if let Some(err) = state.server_time_error.take() {
                return Err(err);
            }
            (state.server_time, state.clock, state.server_time_latency)
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if let Some((origin, anchor)) = clock {
            let elapsed = chrono::Duration::from_std(anchor.elapsed())
                .map_err(|e| Error::Other(e.to_string()))?;
            return Ok(origin + elapsed);
        }
        fixed.ok_or_else(|| Error::Network("server time not set".into()))
    }

    async fn listed_symbols(&self) -> Result<HashSet<String>> {
        let mut state = self.state.lock().await;
        if let Some(err) = state.listing_error.take() {
            return Err(err);
        }
        Ok(state.listed.clone())
    }
}

pub fn at(epoch_secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(epoch_secs, 0).unwrap()
}

/// Bar covering `[open_time, open_time + period)`.
pub fn bar(open_time: DateTime<Utc>, period_secs: u64, o: f64, h: f64, l: f64, c: f64) -> Bar {
    Bar {
        open_time,
        close_time: open_time + chrono::Duration::seconds(period_secs as i64),
        open: o,
        high: h,
        low: l,
        close: c,
    }
}
