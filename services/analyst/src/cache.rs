//! Result cache
//!
//! Fingerprint-keyed, TTL-bounded memoization of final (post-filter)
//! signals. Reads and writes are safe under concurrent access; a lost
//! update between two requests racing on the same fingerprint is
//! acceptable (last write wins), a torn read is not — `DashMap` guarantees
//! entry-level atomicity. The sweeper removes one entry at a time and
//! never holds a shard lock across entries.

use analyst_types::{Candle, Signal, Timeframe};
use dashmap::DashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// A cached final signal.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub signal: Signal,
    pub created_at_ms: u64,
}

/// Stable cache key for `(symbol, timeframe, candle snapshot)`.
pub fn fingerprint(symbol: &str, timeframe: Timeframe, candle: &Candle) -> String {
    format!(
        "{}:{}:{}:{}:{}:{}",
        symbol, timeframe, candle.open, candle.high, candle.low, candle.close
    )
}

pub struct AnalysisCache {
    entries: DashMap<String, CacheEntry>,
    ttl_ms: u64,
}

impl AnalysisCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_ms: ttl.as_millis() as u64,
        }
    }

    /// Valid cached signal for the key, if any.
    pub fn get(&self, key: &str) -> Option<Signal> {
        self.get_at(key, now_ms())
    }

    pub fn get_at(&self, key: &str, now_ms: u64) -> Option<Signal> {
        let entry = self.entries.get(key)?;
        if now_ms.saturating_sub(entry.created_at_ms) < self.ttl_ms {
            Some(entry.signal.clone())
        } else {
            None
        }
    }

    /// Store a final signal — unless a disqualifying external condition
    /// (active news risk) is present, in which case any existing entry is
    /// dropped instead, so a possibly-stale decision is never served.
    pub fn put(&self, key: &str, signal: Signal, disqualified: bool) {
        self.put_at(key, signal, disqualified, now_ms());
    }

    pub fn put_at(&self, key: &str, signal: Signal, disqualified: bool, now_ms: u64) {
        if disqualified {
            self.entries.remove(key);
            return;
        }
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                signal,
                created_at_ms: now_ms,
            },
        );
    }

    /// Drop entries older than twice the TTL. Returns the number removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(now_ms())
    }

    pub fn sweep_at(&self, now_ms: u64) -> usize {
        let cutoff = self.ttl_ms * 2;
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| now_ms.saturating_sub(entry.created_at_ms) >= cutoff)
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for key in stale {
            // Re-check under the removal lock: the entry may have been
            // refreshed since the scan.
            if self
                .entries
                .remove_if(&key, |_, e| now_ms.saturating_sub(e.created_at_ms) >= cutoff)
                .is_some()
            {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "cache sweep");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> AnalysisCache {
        AnalysisCache::new(Duration::from_secs(30))
    }

    fn signal() -> Signal {
        Signal::safe_hold("test")
    }

    #[test]
    fn test_round_trip_within_ttl() {
        let cache = cache();
        cache.put_at("k", signal(), false, 1_000);

        assert_eq!(cache.get_at("k", 1_000 + 29_999), Some(signal()));
    }

    #[test]
    fn test_expired_entry_is_absent() {
        let cache = cache();
        cache.put_at("k", signal(), false, 1_000);

        assert_eq!(cache.get_at("k", 1_000 + 30_000), None);
    }

    #[test]
    fn test_absent_key() {
        assert_eq!(cache().get_at("missing", 0), None);
    }

    #[test]
    fn test_disqualified_put_skips_and_deletes() {
        let cache = cache();
        cache.put_at("k", signal(), false, 1_000);

        // News risk active: the stale entry must go, nothing new written.
        cache.put_at("k", signal(), true, 2_000);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_sweep_removes_only_beyond_double_ttl() {
        let cache = cache();
        cache.put_at("old", signal(), false, 0);
        cache.put_at("stale", signal(), false, 25_000); // expired, not yet sweepable
        cache.put_at("fresh", signal(), false, 59_000);

        let removed = cache.sweep_at(60_000);

        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_at("stale", 60_000), None); // expired but present
        assert!(cache.get_at("fresh", 60_000).is_some());
    }

    #[test]
    fn test_last_write_wins() {
        let cache = cache();
        let mut second = signal();
        second.rationale = "second".to_string();

        cache.put_at("k", signal(), false, 1_000);
        cache.put_at("k", second.clone(), false, 1_001);

        assert_eq!(cache.get_at("k", 1_002), Some(second));
    }

    #[test]
    fn test_fingerprint_is_stable_and_distinct() {
        let candle = Candle::new(1.08, 1.09, 1.07, 1.085);
        let a = fingerprint("EURUSD", Timeframe::M5, &candle);
        let b = fingerprint("EURUSD", Timeframe::M5, &candle);
        let c = fingerprint("EURUSD", Timeframe::H1, &candle);
        let d = fingerprint("GBPUSD", Timeframe::M5, &candle);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }
}
