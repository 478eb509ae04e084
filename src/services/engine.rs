// src/services/engine.rs

//! ─── Detection jobs ──────────────────────────────────────────────────────
//! Two single-owner engines, each driven by `scheduler::run_forever`:
//!
//! * `FootprintEngine` – crypto footprint / stop-hunt with OI, CVD and
//!   liquidation confirmation.
//! * `SweepEngine` – FX / metals liquidity sweep on a fixed daily schedule.
//!
//! All mutable state (OI history, dedup set) lives on the engine and is only
//! touched through `&mut self`.
//! ─────────────────────────────────────────────────────────────────────────

use std::sync::Arc;

use async_trait::async_trait;

use crate::services::dedup::{SignalDeduplicator, SignalKey};
use crate::services::market_data::{
    fetch_first_available, CandleFeed, CandleSource, LiquidationSource, OpenInterestSource,
};
use crate::services::notifier::{format_footprint_alert, format_sweep_alert, Notifier};
use crate::services::scheduler::Job;
use crate::services::strategies::confirm::{self, Rejection};
use crate::services::strategies::footprint::{self, FootprintConfig, FootprintScan};
use crate::services::strategies::plan::{footprint_plan, sweep_plan};
use crate::services::strategies::sweep::{self, SweepConfig};
use crate::services::strategies::{Candle, LiquidationHeatmap, OpenInterestHistory, TradePlan};

/// Bars requested per sweep symbol, unless the lookback needs more.
const SWEEP_CANDLES: usize = 100;

/// Where the footprint job gets its data.
#[derive(Clone)]
pub struct FootprintSources {
    /// Tried in order, e.g. futures then spot.
    pub candles: Vec<CandleFeed>,
    pub open_interest: Arc<dyn OpenInterestSource>,
    pub liquidations: Arc<dyn LiquidationSource>,
}

pub struct FootprintEngine {
    symbol: String,
    interval: String,
    limit: usize,
    cfg: FootprintConfig,
    sources: FootprintSources,
    notifier: Arc<dyn Notifier>,
    oi_hist: OpenInterestHistory,
    dedup: SignalDeduplicator,
}

impl FootprintEngine {
    /// `symbol` keys alerts and is the one asked for OI and liquidations.
    pub fn new(
        symbol: impl Into<String>,
        interval: impl Into<String>,
        limit: usize,
        cfg: FootprintConfig,
        sources: FootprintSources,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            interval: interval.into(),
            limit,
            cfg,
            sources,
            notifier,
            oi_hist: OpenInterestHistory::default(),
            dedup: SignalDeduplicator::new(),
        }
    }

    pub fn open_interest(&self) -> &OpenInterestHistory {
        &self.oi_hist
    }

    /// Only positive readings count as samples.
    pub fn record_open_interest(&mut self, value: f64) {
        if value > 0.0 {
            self.oi_hist.push(value);
        }
    }

    /// Confirm each candidate (buys first, then sells) and build plans for
    /// the ones that pass. Already-alerted candles are skipped up front.
    pub fn evaluate(
        &self,
        candles: &[Candle],
        scan: &FootprintScan,
        heatmap: &LiquidationHeatmap,
    ) -> Vec<TradePlan> {
        let mut plans = Vec::new();
        for cand in scan.candidates() {
            let Some(candle) = candles.get(cand.index) else {
                continue;
            };
            if self.dedup.contains(&SignalKey::new(&self.symbol, candle.ts)) {
                continue;
            }
            match confirm::confirm(candles, cand, &scan.cvd, &self.oi_hist, heatmap, &self.cfg) {
                Ok(conf) => plans.push(footprint_plan(&self.symbol, candle, cand, &conf, &self.cfg)),
                Err(Rejection::NotConfirmed) => {
                    log::debug!("{} {} @ {}: not confirmed", self.symbol, cand.side, candle.ts)
                }
                Err(_) => {}
            }
        }
        plans
    }

    async fn fetch_heatmap(&self) -> LiquidationHeatmap {
        match self.sources.liquidations.fetch_heatmap(&self.symbol).await {
            Ok(map) => map,
            Err(e) => {
                log::warn!("liquidations for {}: {e}", self.symbol);
                metrics::increment_counter!("fetch_failures_total", "source" => "liquidations");
                LiquidationHeatmap::new()
            }
        }
    }
}

#[async_trait]
impl Job for FootprintEngine {
    fn name(&self) -> &str {
        "footprint"
    }

    async fn run_cycle(&mut self) -> anyhow::Result<()> {
        let candles = fetch_first_available(&self.sources.candles, &self.interval, self.limit).await;
        if candles.is_empty() {
            log::info!("no candles available for {}; skipping cycle", self.symbol);
            return Ok(());
        }

        let scan = footprint::detect(&candles, &self.cfg);

        match self.sources.open_interest.fetch_open_interest(&self.symbol).await {
            Ok(oi) => self.record_open_interest(oi),
            Err(e) => {
                log::warn!("open interest for {}: {e}", self.symbol);
                metrics::increment_counter!("fetch_failures_total", "source" => "open_interest");
            }
        }

        let heatmap = self.fetch_heatmap().await;
        let plans = self.evaluate(&candles, &scan, &heatmap);
        log::debug!(
            "footprint {}: {} bars, {} buy / {} sell candidates, {} plans",
            self.symbol,
            candles.len(),
            scan.buys.len(),
            scan.sells.len(),
            plans.len()
        );

        for plan in plans {
            let text = format_footprint_alert(&plan);
            deliver(self.notifier.as_ref(), &mut self.dedup, &plan, &text, "footprint").await;
        }
        Ok(())
    }
}

pub struct SweepEngine {
    symbols: Vec<String>,
    interval: String,
    cfg: SweepConfig,
    /// Tried in order for every symbol.
    sources: Vec<Arc<dyn CandleSource>>,
    notifier: Arc<dyn Notifier>,
    dedup: SignalDeduplicator,
}

impl SweepEngine {
    pub fn new(
        symbols: Vec<String>,
        interval: impl Into<String>,
        cfg: SweepConfig,
        sources: Vec<Arc<dyn CandleSource>>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            symbols,
            interval: interval.into(),
            cfg,
            sources,
            notifier,
            dedup: SignalDeduplicator::new(),
        }
    }

    fn limit(&self) -> usize {
        SWEEP_CANDLES.max(self.cfg.lookback + 2)
    }

    /// Detect on an already-fetched series.
    pub fn evaluate(&self, symbol: &str, candles: &[Candle]) -> Option<TradePlan> {
        match sweep::detect(candles, &self.cfg) {
            Ok(s) => Some(sweep_plan(symbol, &s, &self.cfg)),
            Err(reason) => {
                log::debug!("sweep {symbol}: {}", reason.code());
                None
            }
        }
    }
}

#[async_trait]
impl Job for SweepEngine {
    fn name(&self) -> &str {
        "sweep"
    }

    async fn run_cycle(&mut self) -> anyhow::Result<()> {
        let limit = self.limit();
        for symbol in self.symbols.clone() {
            let feeds: Vec<CandleFeed> = self
                .sources
                .iter()
                .map(|s| CandleFeed::new(Arc::clone(s), symbol.as_str()))
                .collect();
            let candles = fetch_first_available(&feeds, &self.interval, limit).await;
            if candles.is_empty() {
                log::warn!("sweep {symbol}: no candles from any source");
                continue;
            }
            if let Some(plan) = self.evaluate(&symbol, &candles) {
                let text = format_sweep_alert(&plan);
                deliver(self.notifier.as_ref(), &mut self.dedup, &plan, &text, "sweep").await;
            }
        }
        Ok(())
    }
}

/// Mark the plan's candle as alerted, then send. The key is kept even when
/// delivery fails so a broken notifier cannot cause a resend storm.
async fn deliver(
    notifier: &dyn Notifier,
    dedup: &mut SignalDeduplicator,
    plan: &TradePlan,
    text: &str,
    strategy: &'static str,
) -> bool {
    if !dedup.insert(SignalKey::new(&plan.symbol, plan.candle_ts)) {
        return false;
    }
    match notifier.send(text).await {
        Ok(()) => {
            log::info!(
                "{strategy} {} {} entry {} sl {} tp {}",
                plan.side,
                plan.symbol,
                plan.entry,
                plan.stop_loss,
                plan.take_profit
            );
            metrics::increment_counter!(
                "signals_emitted_total",
                "strategy" => strategy,
                "side" => plan.side.to_string()
            );
            true
        }
        Err(e) => {
            log::warn!("{strategy} alert for {} not delivered: {e}", plan.symbol);
            metrics::increment_counter!("notify_failures_total");
            false
        }
    }
}
