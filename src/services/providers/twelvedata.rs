// src/services/providers/twelvedata.rs

//! Twelve Data time-series adapter, primary feed for FX and metals.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde_json::Value;

use crate::services::market_data::{get_json, http_client, normalise, value_f64, CandleSource};
use crate::services::strategies::Candle;
use crate::utils::errors::ApiError;

pub const TWELVEDATA_REST: &str = "https://api.twelvedata.com";

const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct TwelveData {
    http: Client,
    base: String,
    api_key: String,
}

impl TwelveData {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: http_client(),
            base: TWELVEDATA_REST.into(),
            api_key: api_key.into(),
        }
    }
}

/// `EURUSD` → `EUR/USD`; anything not six letters is passed through.
pub fn pair_symbol(symbol: &str) -> String {
    if symbol.len() == 6 && symbol.chars().all(|c| c.is_ascii_alphabetic()) {
        format!("{}/{}", &symbol[..3], &symbol[3..])
    } else {
        symbol.to_string()
    }
}

/// `15m` → `15min`, `1h` → `1h`, `1d` → `1day`.
pub fn interval_code(interval: &str) -> String {
    if let Some(n) = interval.strip_suffix('m') {
        format!("{n}min")
    } else if let Some(n) = interval.strip_suffix('d') {
        format!("{n}day")
    } else {
        interval.to_string()
    }
}

#[async_trait]
impl CandleSource for TwelveData {
    fn name(&self) -> &str {
        "twelvedata"
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, ApiError> {
        let url = format!("{}/time_series", self.base);
        let query = [
            ("symbol", pair_symbol(symbol)),
            ("interval", interval_code(interval)),
            ("outputsize", limit.to_string()),
            ("timezone", "UTC".to_string()),
            ("apikey", self.api_key.clone()),
        ];
        let body = get_json(&self.http, &url, &query, TIMEOUT).await?;
        parse_time_series(&body)
    }
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()?
                .and_hms_opt(0, 0, 0)
        })
}

fn candle_from_value(v: &Value) -> Option<Candle> {
    let field = |k: &str| v.get(k).and_then(value_f64);
    let candle = Candle {
        ts: parse_datetime(v.get("datetime")?.as_str()?)?.and_utc(),
        open: field("open")?,
        high: field("high")?,
        low: field("low")?,
        close: field("close")?,
        // FX quotes carry no volume
        volume: field("volume").unwrap_or(0.0),
    };
    candle.is_well_formed().then_some(candle)
}

/// `{ status: "ok", values: [{ datetime, open, high, low, close, volume? }] }`, newest first.
fn parse_time_series(body: &Value) -> Result<Vec<Candle>, ApiError> {
    if body.get("status").and_then(Value::as_str) == Some("error") {
        let msg = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(ApiError::Malformed(format!("twelvedata: {msg}")));
    }
    let values = body
        .get("values")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::Malformed("twelvedata: no values array".into()))?;
    Ok(normalise(values.iter().filter_map(candle_from_value).collect()))
}
