//! Entry / stop / target derivation for both detectors.

use super::confirm::Confirmation;
use super::footprint::{Candidate, FootprintConfig};
use super::sweep::{Sweep, SweepConfig};
use super::{round_to, Candle, Side, TradePlan};

/// How far beyond the sweep extreme the stop sits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopDistance {
    /// Fixed number of pips; `pip` is the price value of one pip.
    Pips { pips: f64, pip: f64 },
    /// Fixed absolute price distance.
    Dollars(f64),
}

impl StopDistance {
    pub fn in_price(self) -> f64 {
        match self {
            StopDistance::Pips { pips, pip } => pips * pip,
            StopDistance::Dollars(d) => d,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstrumentSpec {
    pub stop: StopDistance,
    pub decimals: u32,
}

pub fn is_metal(symbol: &str) -> bool {
    let s = symbol.to_ascii_uppercase();
    s.starts_with("XAU") || s.starts_with("XAG")
}

/// Per-symbol stop distance and display precision.
pub fn instrument_for(symbol: &str, cfg: &SweepConfig) -> InstrumentSpec {
    if is_metal(symbol) {
        return InstrumentSpec {
            stop: StopDistance::Dollars(cfg.metal_stop_dollars),
            decimals: 2,
        };
    }
    let jpy_quoted = symbol.to_ascii_uppercase().ends_with("JPY");
    let (pip, decimals) = if jpy_quoted { (0.01, 3) } else { (0.0001, 5) };
    InstrumentSpec {
        stop: StopDistance::Pips {
            pips: cfg.fx_stop_pips,
            pip,
        },
        decimals,
    }
}

fn target(entry: f64, stop: f64, side: Side, rr: u32) -> f64 {
    entry + side.sign() * (entry - stop).abs() * rr as f64
}

/// Stop at the footprint candle's extreme, entry at its close.
pub fn footprint_plan(
    symbol: &str,
    candle: &Candle,
    candidate: &Candidate,
    confirmation: &Confirmation,
    cfg: &FootprintConfig,
) -> TradePlan {
    let d = cfg.price_decimals;
    let stop = match candidate.side {
        Side::Buy => round_to(candle.low, d),
        Side::Sell => round_to(candle.high, d),
    };
    let entry = round_to(candle.close, d);
    TradePlan {
        symbol: symbol.to_string(),
        side: candidate.side,
        entry,
        stop_loss: stop,
        take_profit: round_to(target(entry, stop, candidate.side, cfg.rr), d),
        rr: cfg.rr,
        rationale: confirmation.rationale(),
        candle_ts: candle.ts,
    }
}

/// Stop a fixed distance beyond the sweep extreme; entry no better than the
/// midpoint between the confirmation close and that extreme.
pub fn sweep_plan(symbol: &str, sweep: &Sweep, cfg: &SweepConfig) -> TradePlan {
    let spec = instrument_for(symbol, cfg);
    let dist = spec.stop.in_price();
    let (extreme, stop) = match sweep.side {
        Side::Buy => (sweep.sweep.low, sweep.sweep.low - dist),
        Side::Sell => (sweep.sweep.high, sweep.sweep.high + dist),
    };
    let mid = (sweep.confirm.close + extreme) / 2.0;
    let entry = match sweep.side {
        Side::Buy => sweep.confirm.open.max(mid),
        Side::Sell => sweep.confirm.open.min(mid),
    };
    let take_profit = target(entry, stop, sweep.side, cfg.rr);

    let rationale = format!(
        "Swept {} at {} then {} confirmation close {}",
        if sweep.side == Side::Buy { "lows" } else { "highs" },
        round_to(extreme, spec.decimals),
        if sweep.side == Side::Buy { "bullish" } else { "bearish" },
        round_to(sweep.confirm.close, spec.decimals),
    );

    TradePlan {
        symbol: symbol.to_string(),
        side: sweep.side,
        entry: round_to(entry, spec.decimals),
        stop_loss: round_to(stop, spec.decimals),
        take_profit: round_to(take_profit, spec.decimals),
        rr: cfg.rr,
        rationale,
        candle_ts: sweep.confirm.ts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::strategies::common::test_support::bar;
    use crate::services::strategies::footprint::WickProfile;

    fn conf() -> Confirmation {
        Confirmation {
            oi_spike: true,
            cvd_rising: true,
            liquidity_mass: 15_000.0,
        }
    }

    #[test]
    fn footprint_buy_levels() {
        let c = bar(20, 105.0, 110.0, 90.0, 108.0, 1_000.0);
        let cand = Candidate {
            index: 20,
            side: Side::Buy,
            wicks: WickProfile::of(&c).unwrap(),
        };
        let p = footprint_plan("BTCUSDT", &c, &cand, &conf(), &FootprintConfig::default());
        assert_eq!(p.side, Side::Buy);
        assert_eq!(p.stop_loss, 90.0);
        assert_eq!(p.entry, 108.0);
        assert_eq!(p.take_profit, 180.0);
        assert_eq!(p.rr, 4);
        assert_eq!(p.candle_ts, c.ts);
    }

    #[test]
    fn footprint_sell_levels_are_rounded() {
        let c = bar(20, 95.123, 110.456, 90.0, 92.004, 1_000.0);
        let cand = Candidate {
            index: 20,
            side: Side::Sell,
            wicks: WickProfile::of(&c).unwrap(),
        };
        let p = footprint_plan("BTCUSDT", &c, &cand, &conf(), &FootprintConfig::default());
        assert_eq!(p.stop_loss, 110.46);
        assert_eq!(p.entry, 92.0);
        // 92 - 18.46 * 4
        assert_eq!(p.take_profit, 18.16);
    }

    #[test]
    fn instrument_lookup() {
        let cfg = SweepConfig::default();
        assert_eq!(
            instrument_for("XAUUSD", &cfg),
            InstrumentSpec { stop: StopDistance::Dollars(3.0), decimals: 2 }
        );
        let eu = instrument_for("EURUSD", &cfg);
        assert!((eu.stop.in_price() - 0.0010).abs() < 1e-12);
        assert_eq!(eu.decimals, 5);
        let uj = instrument_for("usdjpy", &cfg);
        assert!((uj.stop.in_price() - 0.10).abs() < 1e-12);
        assert_eq!(uj.decimals, 3);
    }

    #[test]
    fn sweep_long_entry_uses_midpoint_when_above_open() {
        let sweep = Sweep {
            side: Side::Buy,
            sweep: bar(0, 2001.0, 2005.0, 1990.0, 2003.0, 1.0),
            confirm: bar(1, 1995.0, 2012.0, 1994.0, 2010.0, 1.0),
        };
        let p = sweep_plan("XAUUSD", &sweep, &SweepConfig::default());
        // mid = (2010 + 1990) / 2 = 2000 > open 1995
        assert_eq!(p.entry, 2000.0);
        assert_eq!(p.stop_loss, 1987.0);
        assert_eq!(p.take_profit, 2052.0);
        assert_eq!(p.candle_ts, sweep.confirm.ts);
    }

    #[test]
    fn sweep_long_entry_uses_open_when_above_midpoint() {
        let sweep = Sweep {
            side: Side::Buy,
            sweep: bar(0, 2001.0, 2005.0, 1990.0, 2003.0, 1.0),
            confirm: bar(1, 2004.0, 2012.0, 2003.0, 2008.0, 1.0),
        };
        let p = sweep_plan("XAUUSD", &sweep, &SweepConfig::default());
        assert_eq!(p.entry, 2004.0);
    }

    #[test]
    fn sweep_short_fx_levels() {
        let sweep = Sweep {
            side: Side::Sell,
            sweep: bar(0, 1.1022, 1.1100, 1.1000, 1.1020, 1.0),
            confirm: bar(1, 1.1040, 1.1050, 1.1000, 1.1010, 1.0),
        };
        let p = sweep_plan("EURUSD", &sweep, &SweepConfig::default());
        // mid = (1.1010 + 1.1100) / 2 = 1.1055, open 1.1040 → min
        assert_eq!(p.entry, 1.104);
        assert_eq!(p.stop_loss, 1.111);
        // 1.1040 - 0.0070 * 4
        assert_eq!(p.take_profit, 1.076);
        assert!(p.rationale.contains("highs"));
    }
}
