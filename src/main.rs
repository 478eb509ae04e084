use std::net::SocketAddr;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;

use whale_footprint::{
    config::settings::Settings,
    services::engine::{FootprintEngine, FootprintSources, SweepEngine},
    services::market_data::{CandleFeed, CandleSource},
    services::notifier::{LogNotifier, Notifier, TelegramNotifier},
    services::providers::{
        bitget::{BitgetFutures, BitgetSpot},
        coinglass::CoinGlass,
        twelvedata::TwelveData,
        yahoo::Yahoo,
    },
    services::scheduler::{self, Trigger},
};

fn init_logging() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
        .init();
}

fn install_metrics(addr: &str) {
    let listen: SocketAddr = match addr.parse() {
        Ok(a) => a,
        Err(e) => {
            log::warn!("METRICS_ADDR {addr:?} ignored: {e}");
            return;
        }
    };
    match PrometheusBuilder::new().with_http_listener(listen).install() {
        Ok(()) => log::info!("prometheus metrics on http://{listen}/metrics"),
        Err(e) => log::warn!("metrics exporter not started: {e}"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logging();

    let settings = Settings::new().unwrap_or_else(|e| {
        eprintln!("Failed to load settings: {e}");
        std::process::exit(1);
    });

    if let Some(addr) = &settings.metrics_addr {
        install_metrics(addr);
    }

    let notifier: Arc<dyn Notifier> = match &settings.telegram {
        Some(t) => Arc::new(TelegramNotifier::new(&t.token, &t.chat_id)),
        None => {
            log::warn!("TELEGRAM_TOKEN not set; alerts will only be logged");
            Arc::new(LogNotifier)
        }
    };

    // --- footprint job -------------------------------------------------------
    let futures = Arc::new(BitgetFutures::new());
    let sources = FootprintSources {
        candles: vec![
            CandleFeed::new(futures.clone(), settings.futures_symbol.as_str()),
            CandleFeed::new(Arc::new(BitgetSpot::new()), settings.spot_symbol.as_str()),
        ],
        open_interest: futures,
        liquidations: Arc::new(CoinGlass::new()),
    };
    let mut footprint = FootprintEngine::new(
        settings.futures_symbol.as_str(),
        settings.interval.as_str(),
        settings.candle_limit,
        settings.footprint.clone(),
        sources,
        notifier.clone(),
    );
    log::info!(
        "Starting whale footprint bot on {} {} (poll {}s)",
        settings.futures_symbol,
        settings.interval,
        settings.poll_seconds
    );
    let poll = Trigger::Every(settings.poll_interval());
    let mut jobs = vec![tokio::spawn(async move {
        scheduler::run_forever(&mut footprint, poll).await
    })];

    // --- sweep job -----------------------------------------------------------
    if let Some(sw) = settings.sweep.clone() {
        let mut feeds: Vec<Arc<dyn CandleSource>> = Vec::new();
        match sw.twelvedata_api_key {
            Some(key) => feeds.push(Arc::new(TwelveData::new(key))),
            None => log::info!("TWELVEDATA_API_KEY not set; sweep job uses Yahoo only"),
        }
        feeds.push(Arc::new(Yahoo::new()));

        let mut sweep = SweepEngine::new(sw.symbols, sw.interval, sw.strategy, feeds, notifier);
        let trigger = sw.trigger;
        jobs.push(tokio::spawn(async move {
            scheduler::run_forever(&mut sweep, trigger).await
        }));
    }

    for job in jobs {
        if let Err(e) = job.await {
            log::error!("job task ended: {e}");
        }
    }
}
