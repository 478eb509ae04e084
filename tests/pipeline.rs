// tests/pipeline.rs
//
// Drives both engines end to end through in-memory sources and a notifier
// that records what it was asked to send.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use whale_footprint::services::engine::{FootprintEngine, FootprintSources, SweepEngine};
use whale_footprint::services::market_data::{
    CandleFeed, CandleSource, LiquidationSource, OpenInterestSource,
};
use whale_footprint::services::notifier::Notifier;
use whale_footprint::services::scheduler::Job;
use whale_footprint::services::strategies::footprint::FootprintConfig;
use whale_footprint::services::strategies::sweep::SweepConfig;
use whale_footprint::services::strategies::{Candle, LiquidationHeatmap};
use whale_footprint::utils::errors::{ApiError, NotifyError};

/* ───────────────────────────────────────────────────────────  fakes ──── */

struct StaticCandles(Vec<Candle>);

#[async_trait]
impl CandleSource for StaticCandles {
    fn name(&self) -> &str {
        "static"
    }
    async fn fetch_candles(&self, _: &str, _: &str, _: usize) -> Result<Vec<Candle>, ApiError> {
        Ok(self.0.clone())
    }
}

struct Unreachable;

#[async_trait]
impl CandleSource for Unreachable {
    fn name(&self) -> &str {
        "unreachable"
    }
    async fn fetch_candles(&self, _: &str, _: &str, _: usize) -> Result<Vec<Candle>, ApiError> {
        Err(ApiError::Status { status: 503, url: "http://primary".into() })
    }
}

struct FixedOi(f64);

#[async_trait]
impl OpenInterestSource for FixedOi {
    async fn fetch_open_interest(&self, _: &str) -> Result<f64, ApiError> {
        Ok(self.0)
    }
}

struct FixedHeatmap(Vec<(f64, f64)>);

#[async_trait]
impl LiquidationSource for FixedHeatmap {
    async fn fetch_heatmap(&self, _: &str) -> Result<LiquidationHeatmap, ApiError> {
        Ok(self.0.iter().copied().collect())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/* ─────────────────────────────────────────────────────────  fixtures ─── */

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 10, 0, 0).unwrap()
}

fn candle(i: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
    Candle {
        ts: start() + Duration::minutes(15 * i as i64),
        open,
        high,
        low,
        close,
        volume,
    }
}

/// `n` quiet bullish bars around 100, with the footprint bar at index 20
/// (15:00 UTC, inside the NY window).
fn footprint_tape(n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            if i == 20 {
                candle(i, 105.0, 110.0, 90.0, 108.0, 1000.0)
            } else {
                candle(i, 100.0, 101.5, 99.0, 100.5, 300.0)
            }
        })
        .collect()
}

fn footprint_engine(candles: Vec<Candle>, notifier: Arc<RecordingNotifier>) -> FootprintEngine {
    let sources = FootprintSources {
        candles: vec![CandleFeed::new(Arc::new(StaticCandles(candles)), "BTCUSDT")],
        // +2% over the seeded baseline
        open_interest: Arc::new(FixedOi(1020.0)),
        liquidations: Arc::new(FixedHeatmap(vec![(100.0, 15_000.0), (5_000.0, 90_000.0)])),
    };
    let mut engine =
        FootprintEngine::new("BTCUSDT", "15m", 300, FootprintConfig::default(), sources, notifier);
    for _ in 0..12 {
        engine.record_open_interest(1000.0);
    }
    engine
}

/* ───────────────────────────────────────────────────────────  tests ──── */

#[tokio::test]
async fn test_footprint_buy_end_to_end() {
    let rec = Arc::new(RecordingNotifier::default());
    let mut engine = footprint_engine(footprint_tape(24), rec.clone());

    engine.run_cycle().await.unwrap();

    let sent = rec.messages();
    println!("alerts: {sent:?}");
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0],
        "🐋 WHALE FOOTPRINT BUY - BTCUSDT\n\
         Entry: 108  SL: 90  TP: 180  RR:1:4\n\
         OI_spike:true  CVD_rising:true  LiqMass:15000"
    );
}

#[tokio::test]
async fn test_footprint_same_candle_alerts_once() {
    let rec = Arc::new(RecordingNotifier::default());
    let mut engine = footprint_engine(footprint_tape(24), rec.clone());

    for _ in 0..3 {
        engine.run_cycle().await.unwrap();
    }
    assert_eq!(rec.messages().len(), 1);
}

#[tokio::test]
async fn test_footprint_older_than_four_bars_is_ignored() {
    let rec = Arc::new(RecordingNotifier::default());
    // index 20 of 25 is five bars from the end
    let mut engine = footprint_engine(footprint_tape(25), rec.clone());

    engine.run_cycle().await.unwrap();
    assert!(rec.messages().is_empty());
}

#[tokio::test]
async fn test_footprint_needs_liquidity_above_threshold() {
    let rec = Arc::new(RecordingNotifier::default());
    let sources = FootprintSources {
        candles: vec![CandleFeed::new(Arc::new(StaticCandles(footprint_tape(24))), "BTCUSDT")],
        open_interest: Arc::new(FixedOi(1020.0)),
        liquidations: Arc::new(FixedHeatmap(vec![(100.0, 10_000.0)])),
    };
    let mut engine =
        FootprintEngine::new("BTCUSDT", "15m", 300, FootprintConfig::default(), sources, rec.clone());
    for _ in 0..12 {
        engine.record_open_interest(1000.0);
    }

    engine.run_cycle().await.unwrap();
    assert!(rec.messages().is_empty());
}

/// Quiet gold tape with a swept low at bar 8 and a bullish close at bar 9.
fn gold_tape() -> Vec<Candle> {
    let mut c: Vec<Candle> = (0..8)
        .map(|i| candle(i, 2030.4, 2031.0, 2030.0, 2030.6, 0.0))
        .collect();
    c.push(candle(8, 2030.2, 2030.8, 2025.0, 2030.5, 0.0));
    c.push(candle(9, 2030.0, 2031.5, 2029.8, 2031.2, 0.0));
    c.push(candle(10, 2031.2, 2031.6, 2031.0, 2031.4, 0.0));
    c
}

#[tokio::test]
async fn test_sweep_falls_back_and_alerts_once() {
    let rec = Arc::new(RecordingNotifier::default());
    let sources: Vec<Arc<dyn CandleSource>> =
        vec![Arc::new(Unreachable), Arc::new(StaticCandles(gold_tape()))];
    let cfg = SweepConfig {
        lookback: 8,
        ..SweepConfig::default()
    };
    let mut engine = SweepEngine::new(vec!["XAUUSD".into()], "15m", cfg, sources, rec.clone());

    engine.run_cycle().await.unwrap();
    engine.run_cycle().await.unwrap();

    let sent = rec.messages();
    println!("alerts: {sent:?}");
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0],
        "🧹 LIQUIDITY SWEEP LONG - XAUUSD\n\
         Entry: 2030  SL: 2022  TP: 2062  RR:1:4\n\
         Swept lows at 2025 then bullish confirmation close 2031.2"
    );
}

#[tokio::test]
async fn test_sweep_quiet_tape_sends_nothing() {
    let rec = Arc::new(RecordingNotifier::default());
    let quiet: Vec<Candle> = (0..30)
        .map(|i| candle(i, 1.1004, 1.1010, 1.1000, 1.1006, 0.0))
        .collect();
    let sources: Vec<Arc<dyn CandleSource>> = vec![Arc::new(StaticCandles(quiet))];
    let mut engine =
        SweepEngine::new(vec!["EURUSD".into()], "15m", SweepConfig::default(), sources, rec.clone());

    engine.run_cycle().await.unwrap();
    assert!(rec.messages().is_empty());
}
