// src/services/providers/yahoo.rs

//! Yahoo Finance chart endpoint, keyless fallback feed for FX and metals.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;

use crate::services::market_data::{get_json, http_client, normalise, value_f64, CandleSource};
use crate::services::strategies::Candle;
use crate::utils::errors::ApiError;

pub const YAHOO_CHART: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct Yahoo {
    http: Client,
    base: String,
}

impl Yahoo {
    pub fn new() -> Self {
        Self {
            http: http_client(),
            base: YAHOO_CHART.into(),
        }
    }
}

impl Default for Yahoo {
    fn default() -> Self {
        Self::new()
    }
}

/// `XAUUSD` → gold futures, `XAGUSD` → silver futures, `EURUSD` → `EURUSD=X`.
pub fn ticker(symbol: &str) -> String {
    let s = symbol.to_ascii_uppercase();
    if s.starts_with("XAU") {
        "GC=F".into()
    } else if s.starts_with("XAG") {
        "SI=F".into()
    } else {
        format!("{s}=X")
    }
}

/// Yahoo has no 4h bars; hourly intervals all map to 60m.
fn interval_and_range(interval: &str) -> (&'static str, &'static str) {
    match interval {
        "1m" => ("1m", "1d"),
        "5m" => ("5m", "5d"),
        "15m" => ("15m", "5d"),
        "30m" => ("30m", "1mo"),
        i if i.ends_with('h') => ("60m", "1mo"),
        i if i.ends_with('d') => ("1d", "1y"),
        _ => ("15m", "5d"),
    }
}

#[async_trait]
impl CandleSource for Yahoo {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, ApiError> {
        let url = format!("{}/{}", self.base, ticker(symbol));
        let (yi, range) = interval_and_range(interval);
        let query = [("interval", yi.to_string()), ("range", range.to_string())];
        let body = get_json(&self.http, &url, &query, TIMEOUT).await?;
        let mut candles = parse_chart(&body)?;
        if candles.len() > limit {
            candles.drain(..candles.len() - limit);
        }
        Ok(candles)
    }
}

/// `chart.result[0]` holds parallel arrays; bars with any null OHLC are skipped.
fn parse_chart(body: &Value) -> Result<Vec<Candle>, ApiError> {
    let chart = body
        .get("chart")
        .ok_or_else(|| ApiError::Malformed("yahoo: no chart".into()))?;
    if let Some(err) = chart.get("error").filter(|e| !e.is_null()) {
        let msg = err
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(ApiError::Malformed(format!("yahoo: {msg}")));
    }
    let result = chart
        .get("result")
        .and_then(|r| r.get(0))
        .ok_or_else(|| ApiError::Malformed("yahoo: empty result".into()))?;

    let empty = Vec::new();
    let stamps = result
        .get("timestamp")
        .and_then(Value::as_array)
        .unwrap_or(&empty);
    let quote = result
        .pointer("/indicators/quote/0")
        .ok_or_else(|| ApiError::Malformed("yahoo: no quote block".into()))?;
    let col = |k: &str| quote.get(k).and_then(Value::as_array).unwrap_or(&empty);
    let (open, high, low, close, volume) = (col("open"), col("high"), col("low"), col("close"), col("volume"));
    let at = |v: &Vec<Value>, i: usize| v.get(i).and_then(value_f64);

    let candles = stamps
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let candle = Candle {
                ts: DateTime::<Utc>::from_timestamp(ts.as_i64()?, 0)?,
                open: at(open, i)?,
                high: at(high, i)?,
                low: at(low, i)?,
                close: at(close, i)?,
                volume: at(volume, i).unwrap_or(0.0),
            };
            candle.is_well_formed().then_some(candle)
        })
        .collect();
    Ok(normalise(candles))
}
