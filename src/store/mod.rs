#[cfg(feature = "dashmap")]
#[cfg_attr(docsrs, doc(cfg(feature = "dashmap")))]
pub mod memory;

#[cfg(feature = "dashmap")]
pub use memory::InMemoryStore;

use std::time::{Duration, Instant};
use thiserror::Error;

/// Error raised by a [WindowStore] implementation.
///
/// The bundled [InMemoryStore] never produces one; this exists so that
/// stores backed by fallible media can surface failures to
/// [RateLimiter::check](crate::RateLimiter::check) instead of masking them
/// as an allow or a deny.
#[derive(Debug, Error)]
#[error("window store failure: {message}")]
pub struct StoreError {
    message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Owns the per-key counting windows used by a
/// [RateLimiter](crate::RateLimiter).
///
/// A store is the single owner of the key to window mapping: at most one
/// window exists per key, and its count is only ever mutated through
/// [WindowStore::increment]. Implementations are usually cheap to [Clone]
/// by wrapping their map in an [Arc](std::sync::Arc); cloning a store is
/// the explicit way to share counters between limiters, distinct stores
/// never share state.
///
/// All operations are expected to complete in O(1) amortized time and must
/// not block indefinitely.
pub trait WindowStore: Send + Sync {
    /// Consumes one slot from the live window for `key`, returning the
    /// post-increment count and the instant at which the window resets.
    ///
    /// If no window exists for `key`, or the existing one has expired, a
    /// fresh window counting this request is installed with a reset instant
    /// of now + `window`. A key that goes quiet for longer than the window
    /// duration therefore fully resets on its next request (fixed-window
    /// semantics; bursts are possible at window boundaries).
    ///
    /// The whole get-or-create-and-increment is a single atomic step with
    /// respect to other callers of the same key: no lost updates, and never
    /// two callers both observing the last free slot.
    fn increment(&self, key: &str, window: Duration) -> Result<(u64, Instant), StoreError>;

    /// Expiry-aware read of the window for `key`.
    ///
    /// Returns [None] when no window exists or the existing one has
    /// expired; an expired window is indistinguishable from an absent one.
    fn peek(&self, key: &str) -> Result<Option<(u64, Instant)>, StoreError>;

    /// Force-deletes the window for `key`.
    ///
    /// Administrative operation, also intended to reset a key before
    /// changing the window duration.
    fn reset(&self, key: &str) -> Result<(), StoreError>;

    /// Drops all windows.
    ///
    /// Administrative operation, primarily useful in tests.
    fn clear(&self) -> Result<(), StoreError>;
}
