//! Secondary checks that turn a footprint candidate into a tradeable signal.
//!
//! All four gates (open-interest spike, CVD direction, liquidation mass,
//! recency) must pass; session gating is optional.

use chrono::Timelike;
use statrs::statistics::{Data as StatsData, Distribution};

use super::footprint::{Candidate, FootprintConfig};
use super::{Candle, LiquidationHeatmap, OpenInterestHistory, Side};

/// Candidates older than this many bars from the end are stale.
pub const RECENT_BARS: usize = 4;
/// Samples needed before an OI spike can be judged.
pub const OI_MIN_SAMPLES: usize = 12;
/// Smallest liquidation search radius, in price units.
pub const MIN_LIQ_WINDOW: f64 = 50.0;
/// Liquidation search radius as a fraction of price.
pub const LIQ_WINDOW_PCT: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Stale,
    OutOfSession,
    NotConfirmed,
}

/// Secondary readings captured for a candidate, whether or not it qualified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Confirmation {
    pub oi_spike: bool,
    pub cvd_rising: bool,
    pub liquidity_mass: f64,
}

impl Confirmation {
    pub fn qualifies(&self, side: Side, liq_threshold: f64) -> bool {
        let mass_ok = self.liquidity_mass > liq_threshold;
        match side {
            Side::Buy => self.oi_spike && self.cvd_rising && mass_ok,
            Side::Sell => self.oi_spike && !self.cvd_rising && mass_ok,
        }
    }

    pub fn rationale(&self) -> String {
        format!(
            "OI_spike:{}  CVD_rising:{}  LiqMass:{}",
            self.oi_spike,
            self.cvd_rising,
            super::round_to(self.liquidity_mass, 2)
        )
    }
}

/// Latest OI sample against the mean of `samples[-12:-2]`, in percent.
pub fn oi_spike(history: &OpenInterestHistory, threshold_pct: f64) -> bool {
    if history.len() < OI_MIN_SAMPLES {
        return false;
    }
    let base = match StatsData::new(history.tail_slice(OI_MIN_SAMPLES, 2)).mean() {
        Some(m) if m > 0.0 => m,
        _ => return false,
    };
    let Some(last) = history.latest() else {
        return false;
    };
    (last - base) / base * 100.0 >= threshold_pct
}

/// CVD from `idx` to the end finished above where it started.
pub fn cvd_rising(cvd: &[f64], idx: usize) -> bool {
    match cvd.get(idx..) {
        Some(after) if after.len() >= 2 => after[after.len() - 1] > after[0],
        _ => false,
    }
}

pub fn liquidation_window(price: f64) -> f64 {
    MIN_LIQ_WINDOW.max(price * LIQ_WINDOW_PCT)
}

pub fn liquidation_mass_near(price: f64, heatmap: &LiquidationHeatmap) -> f64 {
    heatmap.mass_near(price, liquidation_window(price))
}

pub fn is_recent(idx: usize, len: usize) -> bool {
    idx + RECENT_BARS >= len
}

pub fn in_session(c: &Candle, cfg: &FootprintConfig) -> bool {
    cfg.session
        .map_or(true, |s| s.contains_hour(c.ts.hour()))
}

/// Read the secondary signals for one candidate.
pub fn measure(
    candle: &Candle,
    idx: usize,
    cvd: &[f64],
    oi: &OpenInterestHistory,
    heatmap: &LiquidationHeatmap,
    cfg: &FootprintConfig,
) -> Confirmation {
    Confirmation {
        oi_spike: oi_spike(oi, cfg.oi_spike_pct),
        cvd_rising: cvd_rising(cvd, idx),
        liquidity_mass: liquidation_mass_near(candle.close, heatmap),
    }
}

/// Full gate: recency, session, then the conjunctive confirmation.
pub fn confirm(
    candles: &[Candle],
    candidate: &Candidate,
    cvd: &[f64],
    oi: &OpenInterestHistory,
    heatmap: &LiquidationHeatmap,
    cfg: &FootprintConfig,
) -> Result<Confirmation, Rejection> {
    let idx = candidate.index;
    let candle = candles.get(idx).ok_or(Rejection::Stale)?;
    if !is_recent(idx, candles.len()) {
        return Err(Rejection::Stale);
    }
    if !in_session(candle, cfg) {
        return Err(Rejection::OutOfSession);
    }

    let conf = measure(candle, idx, cvd, oi, heatmap, cfg);
    if conf.qualifies(candidate.side, cfg.liq_threshold) {
        Ok(conf)
    } else {
        Err(Rejection::NotConfirmed)
    }
}
