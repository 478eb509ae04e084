use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveTime;
use dotenv::dotenv;

use crate::services::scheduler::Trigger;
use crate::services::strategies::footprint::{FootprintConfig, SessionWindow};
use crate::services::strategies::sweep::SweepConfig;
use crate::utils::errors::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramSettings {
    pub token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone)]
pub struct SweepSettings {
    pub symbols: Vec<String>,
    pub interval: String,
    pub trigger: Trigger,
    pub twelvedata_api_key: Option<String>,
    pub strategy: SweepConfig,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub telegram: Option<TelegramSettings>,
    pub spot_symbol: String,
    pub futures_symbol: String,
    pub interval: String,
    pub candle_limit: usize,
    pub poll_seconds: u64,
    pub footprint: FootprintConfig,
    /// `None` unless `SWEEP_ENABLED` is truthy.
    pub sweep: Option<SweepSettings>,
    pub metrics_addr: Option<String>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        dotenv().ok(); // loads `.env` file automatically
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key → value source (env in production, maps in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let telegram = match (get("TELEGRAM_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat_id)) => Some(TelegramSettings { token, chat_id }),
            (Some(_), None) => return Err(ConfigError::Missing("TELEGRAM_CHAT_ID")),
            _ => None,
        };

        let rr: u32 = parse_or(&get, "RR", 4)?;
        let poll_seconds: u64 = parse_or(&get, "POLL_SECONDS", 60)?;

        let session = if flag_or(&get, "USE_NY_SESSION", true) {
            Some(session_window(
                parse_or(&get, "NY_START_UTC", 12)?,
                parse_or(&get, "NY_END_UTC", 17)?,
            )?)
        } else {
            None
        };

        let footprint = FootprintConfig {
            vol_sma_len: parse_or(&get, "VOL_SMA_LEN", 20)?,
            vol_mult: parse_or(&get, "VOL_MULT", 2.2)?,
            wick_ratio: parse_or(&get, "WICK_RATIO", 0.35)?,
            min_range: parse_or(&get, "MIN_RANGE", 0.0)?,
            session,
            liq_threshold: parse_or(&get, "LIQ_THRESHOLD", 10_000.0)?,
            oi_spike_pct: parse_or(&get, "OI_SPIKE_PCT", 1.5)?,
            rr,
            price_decimals: parse_or(&get, "PRICE_DECIMALS", 2)?,
        };

        let sweep = if flag_or(&get, "SWEEP_ENABLED", false) {
            let symbols: Vec<String> = get("SWEEP_SYMBOLS")
                .unwrap_or_else(|| "EURUSD,XAUUSD".into())
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
            if symbols.is_empty() {
                return Err(ConfigError::Missing("SWEEP_SYMBOLS"));
            }

            // set-but-blank means "poll", unset means the default schedule
            let times = lookup("SWEEP_RUN_TIMES").unwrap_or_else(|| "07:00,13:00".into());
            let trigger = parse_run_times(&times)?
                .map(Trigger::DailyAt)
                .unwrap_or(Trigger::Every(Duration::from_secs(poll_seconds)));

            Some(SweepSettings {
                symbols,
                interval: get("SWEEP_INTERVAL").unwrap_or_else(|| "15m".into()),
                trigger,
                twelvedata_api_key: get("TWELVEDATA_API_KEY"),
                strategy: SweepConfig {
                    lookback: parse_or(&get, "SWEEP_LOOKBACK", 20)?,
                    wick_ratio_threshold: parse_or(&get, "SWEEP_WICK_RATIO", 0.6)?,
                    rr: parse_or(&get, "SWEEP_RR", rr)?,
                    fx_stop_pips: parse_or(&get, "FX_STOP_PIPS", 10.0)?,
                    metal_stop_dollars: parse_or(&get, "METAL_STOP_DOLLARS", 3.0)?,
                },
            })
        } else {
            None
        };

        Ok(Self {
            telegram,
            spot_symbol: get("SPOT_SYMBOL").unwrap_or_else(|| "BTCUSDT".into()),
            futures_symbol: get("FUTURES_SYMBOL").unwrap_or_else(|| "BTCUSDT".into()),
            interval: get("INTERVAL").unwrap_or_else(|| "15m".into()),
            candle_limit: parse_or(&get, "CANDLE_LIMIT", 300)?,
            poll_seconds,
            footprint,
            sweep,
            metrics_addr: get("METRICS_ADDR"),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_seconds)
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

/// `[start, end)` in UTC hours; an empty or out-of-day window would mute every alert.
fn session_window(start_hour: u32, end_hour: u32) -> Result<SessionWindow, ConfigError> {
    if start_hour > 23 {
        return Err(ConfigError::Invalid {
            key: "NY_START_UTC",
            value: start_hour.to_string(),
            reason: "hour must be 0-23".into(),
        });
    }
    if end_hour > 24 || end_hour <= start_hour {
        return Err(ConfigError::Invalid {
            key: "NY_END_UTC",
            value: end_hour.to_string(),
            reason: format!("hour must be after NY_START_UTC ({start_hour}) and at most 24"),
        });
    }
    Ok(SessionWindow {
        start_hour,
        end_hour,
    })
}

/// `1`, `true`, `yes` (any case) are truthy; anything else set is falsy.
fn flag_or<G>(get: &G, key: &str, default: bool) -> bool
where
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

/// `"07:00,13:30"` → sorted UTC times; an empty list means "poll instead".
fn parse_run_times(raw: &str) -> Result<Option<Vec<NaiveTime>>, ConfigError> {
    let mut times = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| ConfigError::Invalid {
                key: "SWEEP_RUN_TIMES",
                value: raw.to_string(),
                reason: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if times.is_empty() {
        return Ok(None);
    }
    times.sort();
    times.dedup();
    Ok(Some(times))
}
