// src/services/providers/coinglass.rs

//! CoinGlass public liquidation info → [`LiquidationHeatmap`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::services::market_data::{get_json, http_client, value_f64, LiquidationSource};
use crate::services::strategies::LiquidationHeatmap;
use crate::utils::errors::ApiError;

pub const COINGLASS_PUBLIC_V2: &str = "https://open-api.coinglass.com/public/v2";

const TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Clone)]
pub struct CoinGlass {
    http: Client,
    base: String,
    time_type: String,
}

impl CoinGlass {
    pub fn new() -> Self {
        Self::with_base_url(COINGLASS_PUBLIC_V2)
    }

    pub fn with_base_url(base: &str) -> Self {
        Self {
            http: http_client(),
            base: base.trim_end_matches('/').to_string(),
            time_type: "h1".into(),
        }
    }
}

impl Default for CoinGlass {
    fn default() -> Self {
        Self::new()
    }
}

/// `BTCUSDT` → `BTC`; CoinGlass keys on the base asset only.
pub fn base_asset(symbol: &str) -> String {
    symbol.replace("USDT", "").chars().take(6).collect()
}

#[async_trait]
impl LiquidationSource for CoinGlass {
    async fn fetch_heatmap(&self, symbol: &str) -> Result<LiquidationHeatmap, ApiError> {
        let url = format!("{}/liquidation_info", self.base);
        let query = [
            ("time_type", self.time_type.clone()),
            ("symbol", base_asset(symbol)),
        ];
        let body = get_json(&self.http, &url, &query, TIMEOUT).await?;
        parse_heatmap(&body)
    }
}

/// `{ data: { items | list: [{ price, liquidation }, ...] } }`.
/// Entries with a zero/missing price or amount are ignored.
fn parse_heatmap(body: &Value) -> Result<LiquidationHeatmap, ApiError> {
    let data = body
        .get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| ApiError::Malformed("coinglass: no data object".into()))?;

    let items = data
        .get("items")
        .or_else(|| data.get("list"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    Ok(items
        .iter()
        .filter_map(|it| {
            let price = it.get("price").and_then(value_f64).unwrap_or(0.0);
            let amount = it.get("liquidation").and_then(value_f64).unwrap_or(0.0);
            (price != 0.0 && amount != 0.0).then_some((price, amount))
        })
        .collect())
}
