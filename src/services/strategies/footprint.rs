//! Whale-footprint / stop-hunt detector
//!
//! Flags candles that print well above-average volume together with a long
//! rejection wick in the direction of the close:
//! * long lower wick + up close   → buy candidate
//! * long upper wick + down close → sell candidate
//!
//! Candidates are only raw material; [`super::confirm`] decides which of them
//! are worth an alert.

use serde::Deserialize;

use super::series::{cumulative_volume_delta, moving_average};
use super::{Candle, Side};

/// UTC hour-of-day window, `start` inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SessionWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl SessionWindow {
    pub fn contains_hour(&self, hour: u32) -> bool {
        self.start_hour <= hour && hour < self.end_hour
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FootprintConfig {
    // volume filter
    pub vol_sma_len: usize,
    pub vol_mult: f64,

    // candle shape
    pub wick_ratio: f64,
    /// `0` disables the minimum-range filter.
    pub min_range: f64,

    // confirmation
    pub session: Option<SessionWindow>,
    pub liq_threshold: f64,
    pub oi_spike_pct: f64,

    // plan
    pub rr: u32,
    pub price_decimals: u32,
}

impl Default for FootprintConfig {
    fn default() -> Self {
        Self {
            vol_sma_len: 20,
            vol_mult: 2.2,
            wick_ratio: 0.35,
            min_range: 0.0,
            session: Some(SessionWindow {
                start_hour: 12,
                end_hour: 17,
            }),
            liq_threshold: 10_000.0,
            oi_spike_pct: 1.5,
            rr: 4,
            price_decimals: 2,
        }
    }
}

/// Wick proportions of a single candle, kept as evidence for the alert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WickProfile {
    pub lower_ratio: f64,
    pub upper_ratio: f64,
}

impl WickProfile {
    /// `None` for zero-range candles.
    pub fn of(c: &Candle) -> Option<Self> {
        let range = c.range();
        if range <= 0.0 {
            return None;
        }
        Some(Self {
            lower_ratio: (c.body_bottom() - c.low) / range,
            upper_ratio: (c.high - c.body_top()) / range,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub index: usize,
    pub side: Side,
    pub wicks: WickProfile,
}

#[derive(Debug, Clone, Default)]
pub struct FootprintScan {
    pub buys: Vec<Candidate>,
    pub sells: Vec<Candidate>,
    /// CVD over the whole series, for the trend check.
    pub cvd: Vec<f64>,
}

impl FootprintScan {
    /// Buys first, then sells, each in series order.
    pub fn candidates(&self) -> impl Iterator<Item = &Candidate> {
        self.buys.iter().chain(self.sells.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.buys.is_empty() && self.sells.is_empty()
    }
}

pub fn detect(candles: &[Candle], cfg: &FootprintConfig) -> FootprintScan {
    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
    let vol_sma = moving_average(&volumes, cfg.vol_sma_len);
    let mut scan = FootprintScan {
        cvd: cumulative_volume_delta(candles),
        ..Default::default()
    };

    for (i, c) in candles.iter().enumerate() {
        let Some(wicks) = WickProfile::of(c) else {
            continue;
        };

        let volume_ok = vol_sma
            .get(i)
            .map_or(true, |avg| c.volume > avg * cfg.vol_mult);
        if !volume_ok {
            continue;
        }
        let range_ok = cfg.min_range == 0.0 || c.range() >= cfg.min_range;
        if !range_ok {
            continue;
        }

        let delta = c.signed_volume();
        if wicks.lower_ratio >= cfg.wick_ratio && delta > 0.0 {
            scan.buys.push(Candidate {
                index: i,
                side: Side::Buy,
                wicks,
            });
        }
        if wicks.upper_ratio >= cfg.wick_ratio && delta < 0.0 {
            scan.sells.push(Candidate {
                index: i,
                side: Side::Sell,
                wicks,
            });
        }
    }

    scan
}
