//! Drives a detection job either on a fixed poll interval or at fixed UTC
//! times of day. Each job owns its state; the loop only decides *when*.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Sleep this long after every cycle.
    Every(Duration),
    /// Fire at each listed UTC time, every day. Must be non-empty and sorted.
    DailyAt(Vec<NaiveTime>),
}

impl Trigger {
    /// How long to wait, from `now`, before the next cycle.
    pub fn next_delay(&self, now: DateTime<Utc>) -> Duration {
        match self {
            Trigger::Every(d) => *d,
            Trigger::DailyAt(times) => {
                let Some(next) = next_daily_fire(times, now) else {
                    return Duration::from_secs(3600);
                };
                (next - now).to_std().unwrap_or(Duration::ZERO)
            }
        }
    }

    /// Interval jobs run straight away; daily jobs wait for their first slot.
    pub fn runs_immediately(&self) -> bool {
        matches!(self, Trigger::Every(_))
    }
}

/// First listed time strictly after `now` today, else the earliest one tomorrow.
pub fn next_daily_fire(times: &[NaiveTime], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let today = now.date_naive();
    let now_t = now.time();
    if let Some(t) = times.iter().filter(|t| **t > now_t).min() {
        return Some(today.and_time(*t).and_utc());
    }
    let first = times.iter().min()?;
    let tomorrow = today.succ_opt()?;
    Some(tomorrow.and_time(*first).and_utc())
}

/// One pass of fetch → detect → notify.
#[async_trait]
pub trait Job: Send {
    fn name(&self) -> &str;
    async fn run_cycle(&mut self) -> anyhow::Result<()>;
}

/// Run `job` forever on `trigger`. Cycle errors are logged and the loop
/// carries on at the next tick.
pub async fn run_forever<J: Job + ?Sized>(job: &mut J, trigger: Trigger) {
    log::info!("{}: scheduler started ({trigger:?})", job.name());

    if !trigger.runs_immediately() {
        wait(&trigger).await;
    }
    loop {
        if let Err(e) = job.run_cycle().await {
            log::error!("{}: cycle failed: {e:#}", job.name());
            metrics::increment_counter!("cycle_failures_total", "job" => job.name().to_string());
        }
        wait(&trigger).await;
    }
}

async fn wait(trigger: &Trigger) {
    let delay = trigger.next_delay(Utc::now());
    log::debug!("next cycle in {:?}", delay);
    tokio::time::sleep(delay).await;
}
