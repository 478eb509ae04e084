//! Data-source seams for the detection jobs.
//! -----------------------------------------------------------------
//! ‣ Every upstream (Bitget, CoinGlass, Twelve Data, Yahoo) sits behind one
//!   of the traits below and returns an explicit `Result`.
//! ‣ Candle feeds are tried in order; the first non-empty answer wins.
//! ‣ Nothing here panics on a bad payload – it becomes `ApiError::Malformed`.
//! -----------------------------------------------------------------

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::services::strategies::{Candle, LiquidationHeatmap};
use crate::utils::errors::ApiError;

#[async_trait]
pub trait CandleSource: Send + Sync {
    fn name(&self) -> &str;
    /// Oldest first.
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, ApiError>;
}

#[async_trait]
pub trait OpenInterestSource: Send + Sync {
    async fn fetch_open_interest(&self, symbol: &str) -> Result<f64, ApiError>;
}

#[async_trait]
pub trait LiquidationSource: Send + Sync {
    async fn fetch_heatmap(&self, symbol: &str) -> Result<LiquidationHeatmap, ApiError>;
}

/// A candle source bound to the symbol it should be asked for.
#[derive(Clone)]
pub struct CandleFeed {
    pub source: Arc<dyn CandleSource>,
    pub symbol: String,
}

impl CandleFeed {
    pub fn new(source: Arc<dyn CandleSource>, symbol: impl Into<String>) -> Self {
        Self {
            source,
            symbol: symbol.into(),
        }
    }
}

/// Try each feed in turn; failures and empty answers fall through to the next.
/// Returns an empty vec when every feed comes up dry.
pub async fn fetch_first_available(feeds: &[CandleFeed], interval: &str, limit: usize) -> Vec<Candle> {
    for feed in feeds {
        match feed.source.fetch_candles(&feed.symbol, interval, limit).await {
            Ok(c) if !c.is_empty() => return c,
            Ok(_) => log::debug!("{} returned no candles for {}", feed.source.name(), feed.symbol),
            Err(e) => {
                if e.is_transient() {
                    log::warn!("{} candles for {}: {e}", feed.source.name(), feed.symbol);
                } else {
                    log::error!("{} candles for {}: {e}", feed.source.name(), feed.symbol);
                }
                metrics::increment_counter!("fetch_failures_total", "source" => feed.source.name().to_string());
            }
        }
    }
    vec![]
}

/// `"15m"` → 900, `"4h"` → 14 400, `"1d"` → 86 400; anything else → 900.
pub fn interval_to_seconds(interval: &str) -> u64 {
    let parse = |n: &str, unit: u64| n.parse::<u64>().ok().map(|v| v * unit);
    let secs = if let Some(n) = interval.strip_suffix('m') {
        parse(n, 60)
    } else if let Some(n) = interval.strip_suffix('h') {
        parse(n, 3_600)
    } else if let Some(n) = interval.strip_suffix('d') {
        parse(n, 86_400)
    } else {
        None
    };
    secs.unwrap_or(900)
}

/* ─────────────────────────────────────────  shared HTTP plumbing ────── */

pub(crate) fn http_client() -> Client {
    Client::builder()
        .user_agent(concat!("whale-footprint/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// GET + status check + JSON decode.
pub(crate) async fn get_json(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    timeout: Duration,
) -> Result<Value, ApiError> {
    let resp = client.get(url).query(query).timeout(timeout).send().await?;
    if resp.status() != StatusCode::OK {
        return Err(ApiError::Status {
            status: resp.status().as_u16(),
            url: url.to_string(),
        });
    }
    let body = resp.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Exchanges send numbers either as JSON numbers or as strings.
pub(crate) fn value_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// `[ts_ms, open, high, low, close, volume, ...]` → Candle.
pub(crate) fn candle_from_row(row: &Value) -> Option<Candle> {
    let cols = row.as_array()?;
    if cols.len() < 6 {
        return None;
    }
    let ts_ms = value_f64(&cols[0])? as i64;
    let candle = Candle {
        ts: DateTime::<Utc>::from_timestamp_millis(ts_ms)?,
        open: value_f64(&cols[1])?,
        high: value_f64(&cols[2])?,
        low: value_f64(&cols[3])?,
        close: value_f64(&cols[4])?,
        volume: value_f64(&cols[5])?,
    };
    candle.is_well_formed().then_some(candle)
}

/// Sort oldest first and drop duplicate timestamps.
pub(crate) fn normalise(mut candles: Vec<Candle>) -> Vec<Candle> {
    candles.sort_by_key(|c| c.ts);
    candles.dedup_by_key(|c| c.ts);
    candles
}
