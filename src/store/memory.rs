use crate::store::{StoreError, WindowStore};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A [WindowStore] that keeps windows in process memory, backed by a
/// [DashMap](dashmap::DashMap).
///
/// Cloning is cheap and clones share the same windows; build separate
/// stores for limiters that must not share quota state.
///
/// Expiry is lazy: an expired window is replaced the next time its key is
/// incremented, and reported as absent by [WindowStore::peek] in the
/// meantime. Keys that stop sending requests keep their last window in
/// memory until [InMemoryStore::sweep] is called. Memory use is bounded by
/// the number of distinct keys seen within one window duration, so callers
/// must not key on unbounded attacker-controlled values.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    map: Arc<DashMap<String, Window>>,
}

struct Window {
    count: u64,
    reset_at: Instant,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every expired window, returning how many were dropped.
    ///
    /// Purely an optimization to bound memory under key churn; skipping it
    /// never changes any decision. The host decides when (or whether) to
    /// call it.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.map.len();
        self.map.retain(|_k, w| w.reset_at > now);
        let swept = before.saturating_sub(self.map.len());
        if swept > 0 {
            log::debug!("swept {swept} expired rate limit windows");
        }
        swept
    }
}

impl WindowStore for InMemoryStore {
    fn increment(&self, key: &str, window: Duration) -> Result<(u64, Instant), StoreError> {
        let now = Instant::now();
        let mut count = 1;
        let mut reset_at = now
            .checked_add(window)
            .expect("window duration unexpectedly large");
        // The entry guard covers the whole read-modify-write, so concurrent
        // callers of the same key serialize here.
        self.map
            .entry(key.to_owned())
            .and_modify(|w| {
                if w.reset_at > now {
                    // Live window: take another slot.
                    w.count += 1;
                    count = w.count;
                    reset_at = w.reset_at;
                } else {
                    // Expired window: replace it, counting this request.
                    w.count = count;
                    w.reset_at = reset_at;
                }
            })
            .or_insert_with(|| Window { count, reset_at });
        Ok((count, reset_at))
    }

    fn peek(&self, key: &str) -> Result<Option<(u64, Instant)>, StoreError> {
        let now = Instant::now();
        Ok(self
            .map
            .get(key)
            .filter(|w| w.reset_at > now)
            .map(|w| (w.count, w.reset_at)))
    }

    fn reset(&self, key: &str) -> Result<(), StoreError> {
        self.map.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.map.clear();
        Ok(())
    }
}
