//! Process-local "already alerted" memory.
//!
//! Keys are kept in insertion order so that trimming always drops the oldest
//! alerts first.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};

/// Trim once the set grows past this many keys …
pub const DEFAULT_CAPACITY: usize = 2_000;
/// … down to this many of the most recent ones.
pub const DEFAULT_RETAIN: usize = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalKey {
    pub symbol: String,
    pub candle_ts: DateTime<Utc>,
}

impl SignalKey {
    pub fn new(symbol: impl Into<String>, candle_ts: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            candle_ts,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignalDeduplicator {
    seen: HashSet<SignalKey>,
    order: VecDeque<SignalKey>,
    capacity: usize,
    retain: usize,
}

impl SignalDeduplicator {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_CAPACITY, DEFAULT_RETAIN)
    }

    pub fn with_limits(capacity: usize, retain: usize) -> Self {
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            capacity,
            retain: retain.min(capacity),
        }
    }

    pub fn contains(&self, key: &SignalKey) -> bool {
        self.seen.contains(key)
    }

    /// Record a key; returns `false` if it was already present.
    pub fn insert(&mut self, key: SignalKey) -> bool {
        if !self.seen.insert(key.clone()) {
            return false;
        }
        self.order.push_back(key);
        if self.order.len() > self.capacity {
            self.trim();
        }
        true
    }

    fn trim(&mut self) {
        while self.order.len() > self.retain {
            if let Some(old) = self.order.pop_front() {
                self.seen.remove(&old);
            }
        }
        log::debug!("dedup set trimmed to {} keys", self.order.len());
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for SignalDeduplicator {
    fn default() -> Self {
        Self::new()
    }
}
