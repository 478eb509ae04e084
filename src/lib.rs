pub mod config {
    pub mod settings;
}
pub mod services {
    pub mod scheduler;
    pub mod market_data;
    pub mod dedup;
    pub mod notifier;
    pub mod engine;

    pub mod providers {
        pub mod bitget;
        pub mod coinglass;
        pub mod twelvedata;
        pub mod yahoo;
    }
    pub mod strategies {
        pub mod common;
        pub use common::{
            round_to, Candle, LiquidationHeatmap, OpenInterestHistory, Side, TradePlan,
        };
        pub mod series;
        pub mod footprint;
        pub mod confirm;
        pub mod sweep;
        pub mod plan;
    }
}

pub mod utils {
    pub mod errors;
}
