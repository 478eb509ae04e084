//! Liquidity sweep + confirmation detector
//!
//! Looks at the trailing `lookback + 1` bars for a candle that pokes below
//! (above) both neighbours, rejects back with a dominant wick, and is followed
//! by a bar closing in the reversal direction. The first qualifying candle in
//! scan order (oldest → newest) wins; later sweeps in the same window are not
//! reported.

use std::fmt;

use serde::Deserialize;

use super::{Candle, Side};

#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    pub lookback: usize,
    /// Strict lower bound on the sweep candle's wick ratio.
    pub wick_ratio_threshold: f64,
    pub rr: u32,
    /// Stop distance for currency pairs, in pips.
    pub fx_stop_pips: f64,
    /// Stop distance for metals, in quote-currency units.
    pub metal_stop_dollars: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            lookback: 20,
            wick_ratio_threshold: 0.6,
            rr: 4,
            fx_stop_pips: 10.0,
            metal_stop_dollars: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sweep {
    pub side: Side,
    pub sweep: Candle,
    pub confirm: Candle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoSignal {
    NotEnoughData,
    NoPattern,
}

impl NoSignal {
    pub fn code(self) -> &'static str {
        match self {
            NoSignal::NotEnoughData => "not_enough_data",
            NoSignal::NoPattern => "no_pattern",
        }
    }
}

impl fmt::Display for NoSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Distance from the top of the body down to the low, over the full range.
fn lower_sweep_ratio(c: &Candle) -> Option<f64> {
    let range = c.range();
    (range > 0.0).then(|| (c.body_top() - c.low) / range)
}

/// Distance from the high down to the bottom of the body, over the full range.
fn upper_sweep_ratio(c: &Candle) -> Option<f64> {
    let range = c.range();
    (range > 0.0).then(|| (c.high - c.body_bottom()) / range)
}

fn is_long_sweep(prev: &Candle, c: &Candle, next: &Candle, threshold: f64) -> bool {
    c.low < prev.low
        && c.low < next.low
        && lower_sweep_ratio(c).is_some_and(|r| r > threshold)
        && next.is_bullish()
}

fn is_short_sweep(prev: &Candle, c: &Candle, next: &Candle, threshold: f64) -> bool {
    c.high > prev.high
        && c.high > next.high
        && upper_sweep_ratio(c).is_some_and(|r| r > threshold)
        && next.is_bearish()
}

pub fn detect(candles: &[Candle], cfg: &SweepConfig) -> Result<Sweep, NoSignal> {
    if candles.len() < cfg.lookback + 2 {
        return Err(NoSignal::NotEnoughData);
    }
    let window = &candles[candles.len() - (cfg.lookback + 1)..];

    for w in window.windows(3) {
        let (prev, c, next) = (&w[0], &w[1], &w[2]);
        if is_long_sweep(prev, c, next, cfg.wick_ratio_threshold) {
            return Ok(Sweep {
                side: Side::Buy,
                sweep: *c,
                confirm: *next,
            });
        }
        if is_short_sweep(prev, c, next, cfg.wick_ratio_threshold) {
            return Ok(Sweep {
                side: Side::Sell,
                sweep: *c,
                confirm: *next,
            });
        }
    }
    Err(NoSignal::NoPattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::strategies::common::test_support::bar;

    const EPS: f64 = 1e-6;

    /// Quiet EURUSD-ish tape: every bar 1.1000–1.1010.
    fn tape(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| bar(i, 1.1004, 1.1010, 1.1000, 1.1006, 100.0))
            .collect()
    }

    fn cfg(lookback: usize) -> SweepConfig {
        SweepConfig {
            lookback,
            ..Default::default()
        }
    }

    #[test]
    fn short_series_reports_not_enough_data() {
        let err = detect(&tape(5), &cfg(3)).unwrap_err();
        assert_eq!(err, NoSignal::NoPattern);
        let err = detect(&tape(5), &cfg(4)).unwrap_err();
        assert_eq!(err, NoSignal::NotEnoughData);
        assert_eq!(err.code(), "not_enough_data");
    }

    #[test]
    fn quiet_tape_has_no_pattern() {
        assert_eq!(detect(&tape(30), &cfg(20)), Err(NoSignal::NoPattern));
    }

    /// Sweep candle with range 1.0900..1.1000 and body top placed so that
    /// the lower ratio equals `ratio`.
    fn long_setup(ratio: f64) -> Vec<Candle> {
        let mut h = tape(10);
        let low = 1.0900;
        let top = low + ratio * 0.0100;
        h[7] = bar(7, top - 0.0001, 1.1000, low, top, 300.0);
        h[8] = bar(8, 1.0950, 1.0990, 1.0940, 1.0980, 200.0); // bullish confirm
        h
    }

    #[test]
    fn lower_wick_ratio_boundary_is_strict() {
        let c = cfg(6);
        // floating rounding can land either side of the boundary; pin it exactly
        let mut at_exact = long_setup(c.wick_ratio_threshold);
        let r = lower_sweep_ratio(&at_exact[7]).unwrap();
        let threshold = SweepConfig {
            wick_ratio_threshold: r,
            ..c.clone()
        };
        assert_eq!(detect(&at_exact, &threshold), Err(NoSignal::NoPattern));

        at_exact[7].close += EPS * 0.0100;
        let hit = detect(&at_exact, &threshold).unwrap();
        assert_eq!(hit.side, Side::Buy);

        let above = long_setup(c.wick_ratio_threshold + 0.01);
        assert!(detect(&above, &c).is_ok());
        let below = long_setup(c.wick_ratio_threshold - 0.01);
        assert_eq!(detect(&below, &c), Err(NoSignal::NoPattern));
    }

    #[test]
    fn long_sweep_needs_bullish_confirmation() {
        let c = cfg(6);
        let mut h = long_setup(0.8);
        assert_eq!(detect(&h, &c).map(|s| s.side), Ok(Side::Buy));

        h[8] = bar(8, 1.0980, 1.0990, 1.0940, 1.0950, 200.0); // bearish confirm
        assert_eq!(detect(&h, &c), Err(NoSignal::NoPattern));
    }

    #[test]
    fn long_sweep_reports_sweep_and_confirm_bars() {
        let h = long_setup(0.8);
        let s = detect(&h, &cfg(6)).unwrap();
        assert_eq!(s.sweep, h[7]);
        assert_eq!(s.confirm, h[8]);
    }

    #[test]
    fn short_sweep_mirrors_long() {
        let mut h = tape(10);
        // high spikes to 1.1100, body bottom at 1.1020 → ratio 0.8
        h[6] = bar(6, 1.1022, 1.1100, 1.1000, 1.1020, 300.0);
        h[7] = bar(7, 1.1040, 1.1050, 1.1000, 1.1010, 200.0); // bearish confirm
        let s = detect(&h, &cfg(6)).unwrap();
        assert_eq!(s.side, Side::Sell);
        assert_eq!(s.sweep, h[6]);
    }

    #[test]
    fn first_match_in_window_wins() {
        let mut h = tape(12);
        // older short sweep
        h[5] = bar(5, 1.1022, 1.1100, 1.1000, 1.1020, 300.0);
        h[6] = bar(6, 1.1040, 1.1050, 1.1001, 1.1010, 200.0);
        // newer long sweep
        h[9] = bar(9, 1.0979, 1.1000, 1.0900, 1.0980, 300.0);
        h[10] = bar(10, 1.0950, 1.0990, 1.0940, 1.0980, 200.0);
        let s = detect(&h, &cfg(8)).unwrap();
        assert_eq!(s.side, Side::Sell);
    }

    #[test]
    fn sweeps_outside_window_are_ignored() {
        let mut h = tape(12);
        h[2] = bar(2, 1.0979, 1.1000, 1.0900, 1.0980, 300.0);
        h[3] = bar(3, 1.0950, 1.0990, 1.0940, 1.0980, 200.0);
        assert_eq!(detect(&h, &cfg(6)), Err(NoSignal::NoPattern));
        assert!(detect(&h, &cfg(10)).is_ok());
    }

    #[test]
    fn zero_range_sweep_candle_never_matches() {
        let mut h = tape(10);
        h[7] = bar(7, 1.0900, 1.0900, 1.0900, 1.0900, 300.0);
        h[8] = bar(8, 1.0950, 1.0990, 1.0940, 1.0980, 200.0);
        assert_eq!(detect(&h, &cfg(6)), Err(NoSignal::NoPattern));
    }
}
