// src/services/providers/bitget.rs

//!  Bitget public REST adapters (no API key needed)
//!
//!  * USDT-M futures candles + open interest (mix v1)
//!  * Spot candles, used as fallback when futures come back empty

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::services::market_data::{
    candle_from_row, get_json, http_client, interval_to_seconds, normalise, value_f64, CandleSource,
    OpenInterestSource,
};
use crate::services::strategies::Candle;
use crate::utils::errors::ApiError;

pub const BITGET_PUBLIC_REST: &str = "https://api.bitget.com";

const FUTURES_TIMEOUT: Duration = Duration::from_secs(12);
const SPOT_TIMEOUT: Duration = Duration::from_secs(10);
const OI_TIMEOUT: Duration = Duration::from_secs(8);

/// Bitget reports open interest under any of these keys depending on product.
const OI_KEYS: [&str; 3] = ["openInterest", "open_interest", "oi"];

#[derive(Clone)]
pub struct BitgetFutures {
    http: Client,
    base: String,
}

impl BitgetFutures {
    pub fn new() -> Self {
        Self::with_base_url(BITGET_PUBLIC_REST)
    }

    pub fn with_base_url(base: &str) -> Self {
        Self {
            http: http_client(),
            base: base.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for BitgetFutures {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandleSource for BitgetFutures {
    fn name(&self) -> &str {
        "bitget-futures"
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, ApiError> {
        let url = format!("{}/api/mix/v1/market/candles", self.base);
        let query = [
            ("symbol", symbol.to_string()),
            ("granularity", interval_to_seconds(interval).to_string()),
            ("limit", limit.to_string()),
        ];
        let body = get_json(&self.http, &url, &query, FUTURES_TIMEOUT).await?;
        parse_futures_candles(&body)
    }
}

#[async_trait]
impl OpenInterestSource for BitgetFutures {
    async fn fetch_open_interest(&self, symbol: &str) -> Result<f64, ApiError> {
        let url = format!("{}/api/mix/v1/market/openInterest", self.base);
        let body = get_json(&self.http, &url, &[("symbol", symbol.to_string())], OI_TIMEOUT).await?;
        parse_open_interest(&body)
    }
}

#[derive(Clone)]
pub struct BitgetSpot {
    http: Client,
    base: String,
}

impl BitgetSpot {
    pub fn new() -> Self {
        Self::with_base_url(BITGET_PUBLIC_REST)
    }

    pub fn with_base_url(base: &str) -> Self {
        Self {
            http: http_client(),
            base: base.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for BitgetSpot {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandleSource for BitgetSpot {
    fn name(&self) -> &str {
        "bitget-spot"
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, ApiError> {
        let url = format!("{}/api/spot/v3/instruments/{symbol}/candles", self.base);
        let query = [
            ("granularity", interval_to_seconds(interval).to_string()),
            ("limit", limit.to_string()),
        ];
        let body = get_json(&self.http, &url, &query, SPOT_TIMEOUT).await?;
        parse_spot_candles(&body)
    }
}

// ---------- Private helpers -----------------------------------------------

fn rows_to_candles(rows: &[Value]) -> Vec<Candle> {
    let candles: Vec<Candle> = rows.iter().filter_map(candle_from_row).collect();
    if candles.len() < rows.len() {
        log::debug!("bitget: dropped {} unparseable rows", rows.len() - candles.len());
    }
    normalise(candles)
}

/// `{ "data": [[ts, o, h, l, c, v, ...], ...] }`, newest first.
fn parse_futures_candles(body: &Value) -> Result<Vec<Candle>, ApiError> {
    let rows = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::Malformed("bitget futures candles: no data array".into()))?;
    Ok(rows_to_candles(rows))
}

/// Bare `[[ts, o, h, l, c, v], ...]`.
fn parse_spot_candles(body: &Value) -> Result<Vec<Candle>, ApiError> {
    let rows = body
        .as_array()
        .ok_or_else(|| ApiError::Malformed("bitget spot candles: expected array".into()))?;
    Ok(rows_to_candles(rows))
}

fn parse_open_interest(body: &Value) -> Result<f64, ApiError> {
    let data = body
        .get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| ApiError::Malformed("bitget open interest: no data object".into()))?;
    OI_KEYS
        .iter()
        .find_map(|k| data.get(*k).and_then(value_f64))
        .ok_or_else(|| ApiError::Malformed("bitget open interest: no interest field".into()))
}
