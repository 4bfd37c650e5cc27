//! Fixed-window request counters for the rate limiter.
//!
//! A window opens on the first increment for a key and closes `window` later.
//! Increments inside an open window never move its deadline; the first
//! increment after the deadline opens a fresh window at 1.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use thiserror::Error;
use tokio::time::Instant;

/// Keys idle longer than this are evicted from [`MemoryCounterStore`].
const DEFAULT_IDLE_EVICTION: Duration = Duration::from_secs(60 * 60);

/// Upper bound on tracked identities.
const DEFAULT_MAX_KEYS: u64 = 100_000;

/// Errors from a counter backend.
#[derive(Debug, Error)]
pub enum CounterError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
}

/// State of a key's window after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Requests seen in the current window, including this one.
    pub count: u64,
    /// Time until the window closes.
    pub resets_in: Duration,
}

/// Atomic increment-with-expiry keyed by string.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment `key`, opening a window of length `window` if none is open.
    async fn incr_with_window(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<WindowCount, CounterError>;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u64,
    resets_at: Instant,
}

/// In-process counter store backed by a `moka` cache.
///
/// Per-key updates go through `and_upsert_with`, which serialises concurrent
/// increments of the same key.
#[derive(Clone)]
pub struct MemoryCounterStore {
    windows: Cache<String, Window>,
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_KEYS, DEFAULT_IDLE_EVICTION)
    }
}

impl MemoryCounterStore {
    #[must_use]
    pub fn new(max_keys: u64, idle_eviction: Duration) -> Self {
        let windows = Cache::builder()
            .max_capacity(max_keys)
            .time_to_idle(idle_eviction)
            .build();
        Self { windows }
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn incr_with_window(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<WindowCount, CounterError> {
        let now = Instant::now();
        let entry = self
            .windows
            .entry(key.to_owned())
            .and_upsert_with(|existing| {
                let next = match existing.map(|e| e.into_value()) {
                    Some(open) if open.resets_at > now => Window {
                        count: open.count.saturating_add(1),
                        resets_at: open.resets_at,
                    },
                    _ => Window {
                        count: 1,
                        resets_at: now + window,
                    },
                };
                std::future::ready(next)
            })
            .await;

        let current = entry.into_value();
        Ok(WindowCount {
            count: current.count,
            resets_in: current.resets_at.saturating_duration_since(now),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_counts_within_window() {
        let store = MemoryCounterStore::default();
        for expected in 1..=3 {
            let state = store.incr_with_window("rl:a", WINDOW).await.unwrap();
            assert_eq!(state.count, expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_increment_does_not_extend_window() {
        let store = MemoryCounterStore::default();
        store.incr_with_window("rl:a", WINDOW).await.unwrap();

        tokio::time::advance(Duration::from_secs(45)).await;
        let state = store.incr_with_window("rl:a", WINDOW).await.unwrap();
        assert_eq!(state.count, 2);
        assert_eq!(state.resets_in, Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_window_restarts_at_one() {
        let store = MemoryCounterStore::default();
        store.incr_with_window("rl:a", WINDOW).await.unwrap();
        store.incr_with_window("rl:a", WINDOW).await.unwrap();

        tokio::time::advance(WINDOW + Duration::from_millis(1)).await;
        let state = store.incr_with_window("rl:a", WINDOW).await.unwrap();
        assert_eq!(state.count, 1);
        assert_eq!(state.resets_in, WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let store = MemoryCounterStore::default();
        store.incr_with_window("rl:a", WINDOW).await.unwrap();
        let other = store.incr_with_window("rl:b", WINDOW).await.unwrap();
        assert_eq!(other.count, 1);
    }
}
