use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use common::{Bar, Error, MarketDataProvider, Result, Timeframe};

pub const DEFAULT_BASE_URL: &str = "https://fapi.binance.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Public REST client for Binance USDT-M futures market data.
/// Only unsigned endpoints are used, so no credentials are needed.
pub struct BinanceFuturesClient {
    base_url: String,
    http: Client,
}

impl BinanceFuturesClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn public_get(&self, path_and_query: &str) -> Result<String> {
        let url = format!("{}{path_and_query}", self.base_url);
        debug!(%url, "Binance GET");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Network(e.to_string()))?;
        check_status(status, body)
    }
}

#[async_trait]
impl MarketDataProvider for BinanceFuturesClient {
    async fn current_price(&self, symbol: &str) -> Result<f64> {
        let body = self
            .public_get(&format!("/fapi/v1/ticker/price?symbol={symbol}"))
            .await?;
        parse_price(&body)
    }

    async fn recent_bars(
        &self,
        symbol: &str,
        timeframe: &Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>> {
        let body = self
            .public_get(&format!(
                "/fapi/v1/klines?symbol={symbol}&interval={}&limit={count}",
                timeframe.name
            ))
            .await?;
        parse_klines(&body, timeframe)
    }

    async fn server_time(&self) -> Result<DateTime<Utc>> {
        let body = self.public_get("/fapi/v1/time").await?;
        parse_server_time(&body)
    }

    async fn listed_symbols(&self) -> Result<HashSet<String>> {
        let body = self.public_get("/fapi/v1/exchangeInfo").await?;
        parse_listed_symbols(&body)
    }
}

/// 429 and 418 (IP ban after repeated 429s) are rate limits; 5xx is treated
/// like a transport failure.
fn check_status(status: StatusCode, body: String) -> Result<String> {
    if status.is_success() {
        return Ok(body);
    }
    let detail = format!("HTTP {status}: {body}");
    match status.as_u16() {
        429 | 418 => Err(Error::RateLimited(detail)),
        500..=599 => Err(Error::Network(detail)),
        _ => Err(Error::Exchange(detail)),
    }
}

fn parse_price(body: &str) -> Result<f64> {
    let ticker: PriceTicker = serde_json::from_str(body)?;
    ticker
        .price
        .parse::<f64>()
        .map_err(|e| Error::DegradedData(format!("price '{}': {e}", ticker.price)))
}

fn parse_server_time(body: &str) -> Result<DateTime<Utc>> {
    let time: ServerTime = serde_json::from_str(body)?;
    millis_to_utc(time.server_time)
}

fn parse_listed_symbols(body: &str) -> Result<HashSet<String>> {
    let info: ExchangeInfo = serde_json::from_str(body)?;
    Ok(info
        .symbols
        .into_iter()
        .filter(|s| s.status == "TRADING")
        .map(|s| s.symbol)
        .collect())
}

/// Kline rows are positional arrays:
/// `[openTime, "open", "high", "low", "close", "volume", closeTime, ...]`.
fn parse_klines(body: &str, timeframe: &Timeframe) -> Result<Vec<Bar>> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(body)?;
    rows.iter().map(|row| parse_kline_row(row, timeframe)).collect()
}

fn parse_kline_row(row: &[Value], timeframe: &Timeframe) -> Result<Bar> {
    let open_ms = row
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::Exchange("kline row without open time".into()))?;
    let open_time = millis_to_utc(open_ms)?;

    let field = |idx: usize, name: &str| -> Result<f64> {
        row.get(idx)
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| Error::DegradedData(format!("kline {name} missing or unparseable")))
    };

    Ok(Bar {
        open_time,
        close_time: open_time + chrono::Duration::seconds(timeframe.seconds as i64),
        open: field(1, "open")?,
        high: field(2, "high")?,
        low: field(3, "low")?,
        close: field(4, "close")?,
    })
}

fn millis_to_utc(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| Error::Exchange(format!("timestamp out of range: {ms}")))
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct PriceTicker {
    price: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerTime {
    server_time: i64,
}

#[derive(Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Deserialize)]
struct SymbolInfo {
    symbol: String,
    status: String,
}
