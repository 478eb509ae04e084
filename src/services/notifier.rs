// src/services/notifier.rs

//! Alert delivery. Telegram when configured, the log otherwise.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::services::strategies::TradePlan;
use crate::utils::errors::NotifyError;

pub const TELEGRAM_API: &str = "https://api.telegram.org";

const TIMEOUT: Duration = Duration::from_secs(10);

/// Thin façade so engines can be tested with a recording double.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize, Debug)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Clone)]
pub struct TelegramNotifier {
    http: Client,
    base: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base: TELEGRAM_API.into(),
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.base, self.token);
        let resp = self
            .http
            .post(&url)
            .timeout(TIMEOUT)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .await?
            .json::<TelegramResponse>()
            .await?;
        check_response(resp)
    }
}

fn check_response(resp: TelegramResponse) -> Result<(), NotifyError> {
    if resp.ok {
        Ok(())
    } else {
        Err(NotifyError::Rejected(
            resp.description.unwrap_or_else(|| "telegram returned ok=false".into()),
        ))
    }
}

/// Used when no Telegram credentials are set.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        log::info!("ALERT\n{text}");
        Ok(())
    }
}

/* ────────────────────────────────────────────────  message text ────── */

fn levels_line(plan: &TradePlan) -> String {
    format!(
        "Entry: {}  SL: {}  TP: {}  RR:1:{}",
        plan.entry, plan.stop_loss, plan.take_profit, plan.rr
    )
}

pub fn format_footprint_alert(plan: &TradePlan) -> String {
    format!(
        "🐋 WHALE FOOTPRINT {} - {}\n{}\n{}",
        plan.side,
        plan.symbol,
        levels_line(plan),
        plan.rationale
    )
}

pub fn format_sweep_alert(plan: &TradePlan) -> String {
    format!(
        "🧹 LIQUIDITY SWEEP {} - {}\n{}\n{}",
        plan.side.as_position(),
        plan.symbol,
        levels_line(plan),
        plan.rationale
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::strategies::common::test_support::base_ts;
    use crate::services::strategies::Side;

    fn plan(side: Side) -> TradePlan {
        TradePlan {
            symbol: "BTCUSDT".into(),
            side,
            entry: 108.0,
            stop_loss: 90.0,
            take_profit: 180.0,
            rr: 4,
            rationale: "OI_spike:true  CVD_rising:true  LiqMass:15000".into(),
            candle_ts: base_ts(),
        }
    }

    #[test]
    fn footprint_text_layout() {
        assert_eq!(
            format_footprint_alert(&plan(Side::Buy)),
            "🐋 WHALE FOOTPRINT BUY - BTCUSDT\n\
             Entry: 108  SL: 90  TP: 180  RR:1:4\n\
             OI_spike:true  CVD_rising:true  LiqMass:15000"
        );
    }

    #[test]
    fn sweep_text_uses_position_words() {
        let mut p = plan(Side::Sell);
        p.symbol = "EURUSD".into();
        p.entry = 1.0855;
        let text = format_sweep_alert(&p);
        assert!(text.starts_with("🧹 LIQUIDITY SWEEP SHORT - EURUSD\nEntry: 1.0855  SL: 90"));
    }

    #[test]
    fn telegram_ok_false_is_rejected() {
        let bad: TelegramResponse =
            serde_json::from_str(r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#).unwrap();
        match check_response(bad) {
            Err(NotifyError::Rejected(m)) => assert_eq!(m, "Bad Request: chat not found"),
            other => panic!("unexpected {other:?}"),
        }
        let good: TelegramResponse = serde_json::from_str(r#"{"ok":true,"result":{}}"#).unwrap();
        assert!(check_response(good).is_ok());
    }

    #[tokio::test]
    async fn unreachable_telegram_error_hides_the_token() {
        let mut tg = TelegramNotifier::new("123456:SECRET-TOKEN", "42");
        tg.base = "http://127.0.0.1:1".into();
        let err = tg.send("hi").await.unwrap_err();
        let line = format!("footprint alert for BTCUSDT not delivered: {err}");
        assert!(matches!(err, NotifyError::Http(_)));
        assert!(!line.contains("SECRET-TOKEN"), "{line}");
    }

    #[tokio::test]
    async fn log_notifier_never_fails() {
        assert!(LogNotifier.send("hello").await.is_ok());
    }
}
