//! Upstream credential rotation
//!
//! Time-sliced selection among multiple oracle API keys. Rotation is
//! interval-based, not load-based: once the interval since the last
//! rotation has elapsed, the next call to [`CredentialRotator::rotate_if_due`]
//! advances the index modulo the pool size. The decision runs under a
//! mutex taken with `try_lock`, so an overlapping call while a rotation is
//! in progress is a no-op rather than a double advance. `current()` is a
//! plain atomic read and takes no lock.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

pub struct CredentialRotator {
    keys: Vec<String>,
    index: AtomicUsize,
    last_rotation_ms: Mutex<u64>,
    interval_ms: u64,
}

impl CredentialRotator {
    pub fn new(keys: Vec<String>, interval: Duration) -> Self {
        Self {
            keys,
            index: AtomicUsize::new(0),
            last_rotation_ms: Mutex::new(now_ms()),
            interval_ms: interval.as_millis() as u64,
        }
    }

    /// Credential at the current index; `None` for an empty pool.
    pub fn current(&self) -> Option<&str> {
        let index = self.index.load(Ordering::SeqCst);
        self.keys.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Advance the index if the rotation interval has elapsed. Returns
    /// whether a rotation happened.
    pub fn rotate_if_due(&self) -> bool {
        self.rotate_if_due_at(now_ms())
    }

    pub fn rotate_if_due_at(&self, now_ms: u64) -> bool {
        if self.keys.len() < 2 {
            return false;
        }

        // A rotation already in progress makes this call a no-op; the
        // due-check, advance and timestamp reset all happen under the guard
        // so overlapping calls never double-advance.
        let Some(mut last) = self.last_rotation_ms.try_lock() else {
            return false;
        };
        if now_ms.saturating_sub(*last) < self.interval_ms {
            return false;
        }

        let next = (self.index.load(Ordering::SeqCst) + 1) % self.keys.len();
        self.index.store(next, Ordering::SeqCst);
        *last = now_ms;
        debug!(index = next, pool = self.keys.len(), "rotated oracle credential");
        true
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
    use std::sync::Arc;

    fn rotator(keys: usize) -> CredentialRotator {
        let keys = (0..keys).map(|i| format!("key-{}", i)).collect();
        let mut r = CredentialRotator::new(keys, Duration::from_secs(60));
        *r.last_rotation_ms.get_mut() = 0;
        r
    }

    #[test]
    fn test_current_without_rotation() {
        let rotator = rotator(3);
        assert_eq!(rotator.current(), Some("key-0"));
        assert_eq!(rotator.current(), Some("key-0"));
    }

    #[test]
    fn test_empty_pool() {
        let rotator = CredentialRotator::new(Vec::new(), Duration::from_secs(60));
        assert_eq!(rotator.current(), None);
        assert!(!rotator.rotate_if_due_at(1_000_000));
    }

    #[test]
    fn test_cycles_through_all_keys() {
        let rotator = rotator(3);
        let mut seen = Vec::new();

        for interval in 1..=6 {
            seen.push(rotator.current().unwrap().to_string());
            rotator.rotate_if_due_at(interval * 60_000);
        }

        // Two full cycles: each key exactly once per 3 intervals.
        assert_eq!(seen, ["key-0", "key-1", "key-2", "key-0", "key-1", "key-2"]);
    }

    #[test]
    fn test_not_due_is_noop() {
        let rotator = rotator(3);
        rotator.rotate_if_due_at(60_000);
        assert_eq!(rotator.current(), Some("key-1"));

        // Same due window: the timestamp was just reset.
        assert!(!rotator.rotate_if_due_at(60_001));
        assert_eq!(rotator.current(), Some("key-1"));
    }

    #[test]
    fn test_concurrent_rotation_advances_once() {
        let rotator = Arc::new(rotator(4));

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let rotator = Arc::clone(&rotator);
                scope.spawn(move || {
                    rotator.rotate_if_due_at(60_000);
                });
            }
        });

        // Whatever the interleaving, exactly one advance for the window.
        assert_eq!(rotator.current(), Some("key-1"));
    }

    #[test]
    fn test_single_key_never_rotates() {
        let rotator = rotator(1);
        assert!(!rotator.rotate_if_due_at(600_000));
        assert_eq!(rotator.current(), Some("key-0"));
    }
}
