// src/services/strategies/common.rs
use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub ts:     DateTime<Utc>,
    pub open:   f64,
    pub high:   f64,
    pub low:    f64,
    pub close:  f64,
    pub volume: f64,
}

impl Candle {
    #[inline]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    #[inline]
    pub fn body_top(&self) -> f64 {
        self.open.max(self.close)
    }

    #[inline]
    pub fn body_bottom(&self) -> f64 {
        self.open.min(self.close)
    }

    #[inline]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    #[inline]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// `+volume` for an up candle, `-volume` for a down candle, `0` otherwise.
    pub fn signed_volume(&self) -> f64 {
        if self.is_bullish() {
            self.volume
        } else if self.is_bearish() {
            -self.volume
        } else {
            0.0
        }
    }

    /// High/low must bracket the body and every field must be finite.
    pub fn is_well_formed(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
            && self.high >= self.body_top()
            && self.low <= self.body_bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// +1 for buys, -1 for sells.
    pub fn sign(self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }

    /// Directional wording used by the sweep alerts.
    pub fn as_position(self) -> &'static str {
        match self {
            Side::Buy => "LONG",
            Side::Sell => "SHORT",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

/// Rolling window of open-interest samples, oldest evicted first.
#[derive(Debug, Clone)]
pub struct OpenInterestHistory {
    samples: VecDeque<f64>,
    max_len: usize,
}

impl OpenInterestHistory {
    pub const DEFAULT_MAX_LEN: usize = 500;

    pub fn new(max_len: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_len.min(1024)),
            max_len: max_len.max(1),
        }
    }

    pub fn push(&mut self, sample: f64) {
        self.samples.push_back(sample);
        while self.samples.len() > self.max_len {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    /// Samples in `[len - from_end, len - to_end)`, mirroring `s[-from_end:-to_end]`.
    pub fn tail_slice(&self, from_end: usize, to_end: usize) -> Vec<f64> {
        let n = self.samples.len();
        if from_end > n || to_end > from_end {
            return vec![];
        }
        self.samples
            .iter()
            .skip(n - from_end)
            .take(from_end - to_end)
            .copied()
            .collect()
    }
}

impl Default for OpenInterestHistory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_LEN)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LiquidationLevel {
    price: f64,
    amount: f64,
}

/// Price level → aggregated liquidation amount. Rebuilt every cycle.
#[derive(Debug, Clone, Default)]
pub struct LiquidationHeatmap {
    levels: Vec<LiquidationLevel>,
}

impl LiquidationHeatmap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Amounts reported for an identical price level accumulate.
    pub fn add(&mut self, price: f64, amount: f64) {
        match self.levels.iter_mut().find(|l| l.price == price) {
            Some(level) => level.amount += amount,
            None => self.levels.push(LiquidationLevel { price, amount }),
        }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Sum of amounts whose level lies within `window` of `price` (inclusive).
    pub fn mass_near(&self, price: f64, window: f64) -> f64 {
        self.levels
            .iter()
            .filter(|l| (l.price - price).abs() <= window)
            .map(|l| l.amount)
            .sum()
    }
}

impl FromIterator<(f64, f64)> for LiquidationHeatmap {
    fn from_iter<I: IntoIterator<Item = (f64, f64)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (price, amount) in iter {
            map.add(price, amount);
        }
        map
    }
}

/// Final, rounded trade levels ready to be formatted into an alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradePlan {
    pub symbol: String,
    pub side: Side,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub rr: u32,
    pub rationale: String,
    pub candle_ts: DateTime<Utc>,
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
