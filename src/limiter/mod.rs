pub mod builder;
mod key;
#[cfg(all(test, feature = "dashmap"))]
mod tests;

pub use key::{KeyExtractorBuilder, FALLBACK_KEY};

#[cfg(feature = "dashmap")]
use crate::store::InMemoryStore;
use crate::store::{StoreError, WindowStore};
use builder::RateLimiterBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Maps a caller's request context to the key used for quota accounting.
///
/// Extractors must not fail: callers whose identity cannot be resolved are
/// accounted against [FALLBACK_KEY] rather than failing the request.
pub type KeyExtractorFn = dyn Fn(&CallerContext) -> String + Send + Sync;

/// Per-request override exempting a request from quota accounting entirely.
pub type SkipFn = dyn Fn(&CallerContext) -> bool + Send + Sync;

/// The slice of an inbound request visible to the limiter.
///
/// Host frameworks build one per request. Both fields are optional; a
/// request with no resolvable network identity is valid input.
#[derive(Debug, Clone, Default)]
pub struct CallerContext {
    peer_addr: Option<SocketAddr>,
    identity: Option<String>,
}

impl CallerContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the network peer address of the caller.
    pub fn with_peer_addr(mut self, addr: SocketAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }

    /// Sets the caller identity (user id, API token, tenant) when the
    /// host's authentication layer has resolved one.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }
}

/// Quota state accompanying a decision, ready to be surfaced as rate limit
/// response headers.
#[derive(Debug, Clone)]
pub struct QuotaStatus {
    /// Total number of requests permitted within the window.
    pub limit: u64,
    /// Requests still permitted until the window resets; clamped at 0.
    pub remaining: u64,
    /// Instant at which the window resets.
    pub reset: Instant,
}

impl QuotaStatus {
    /// Seconds until the window resets (rounded upwards, so that it is
    /// guaranteed to have reset after waiting for the duration).
    pub fn seconds_until_reset(&self) -> u64 {
        let millis = self
            .reset
            .saturating_duration_since(Instant::now())
            .as_millis() as f64;
        (millis / 1000f64).ceil() as u64
    }

    /// The reset instant projected onto the wall clock, as Unix epoch
    /// seconds (the conventional `x-ratelimit-reset` value).
    pub fn reset_epoch_seconds(&self) -> u64 {
        let until_reset = self.reset.saturating_duration_since(Instant::now());
        (SystemTime::now() + until_reset)
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// A rejected request: HTTP 429 semantics plus the metadata a well-behaved
/// client needs in order to back off.
#[derive(Debug, Clone)]
pub struct Denial {
    /// Human readable message for the response body.
    pub message: String,
    /// Advisory seconds to wait before retrying; greater than zero while
    /// the window is live. Accompanies every denial.
    pub retry_after_secs: u64,
    /// Quota state at the time of denial (`remaining` is 0).
    pub quota: QuotaStatus,
}

impl Denial {
    /// Denials are distinguishable from other error kinds by status code
    /// alone.
    pub fn status_code(&self) -> u16 {
        429
    }
}

/// Outcome of [RateLimiter::check].
#[derive(Debug, Clone)]
pub enum Decision {
    /// Request admitted. The quota is [None] only when the skip predicate
    /// bypassed accounting, in which case no window was touched.
    Allowed(Option<QuotaStatus>),
    /// Request over quota. The denied request still consumed a slot.
    Denied(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied(_))
    }

    /// Quota state for either outcome, when a window was consulted.
    pub fn quota(&self) -> Option<&QuotaStatus> {
        match self {
            Self::Allowed(quota) => quota.as_ref(),
            Self::Denied(denial) => Some(&denial.quota),
        }
    }
}

/// Per-key fixed window rate limiter.
///
/// Holds an immutable configuration plus a [WindowStore], and turns one
/// request's identity into an allow/deny decision with reportable quota
/// metadata. The limiter itself performs no I/O and never suspends; it is
/// safe to call from any number of threads.
pub struct RateLimiter<S> {
    store: S,
    window: Duration,
    max_requests: u64,
    message: String,
    key_extractor: Arc<KeyExtractorFn>,
    skip: Arc<SkipFn>,
}

impl<S> RateLimiter<S>
where
    S: WindowStore,
{
    /// # Arguments
    ///
    /// * `store`: The window store owning this limiter's counters. Clone a
    ///   store into several builders to deliberately share quota state.
    pub fn builder(store: S) -> RateLimiterBuilder<S> {
        RateLimiterBuilder::new(store)
    }

    /// Decides whether the request described by `context` is admitted.
    ///
    /// Every non-skipped call consumes one slot from the caller's window,
    /// including calls that end up denied; a caller hammering past its
    /// limit keeps growing the count until the window rolls over, while
    /// the reported `remaining` stays clamped at 0.
    ///
    /// Quota exhaustion is a normal outcome, returned as
    /// [Decision::Denied], never as an error. An [Err] means the store
    /// itself failed, which is propagated rather than mapped to an allow
    /// or a deny.
    pub fn check(&self, context: &CallerContext) -> Result<Decision, StoreError> {
        if (self.skip)(context) {
            return Ok(Decision::Allowed(None));
        }
        let key = (self.key_extractor)(context);
        let (count, reset) = self.store.increment(&key, self.window)?;
        let quota = QuotaStatus {
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(count),
            reset,
        };
        // Strictly greater: the request that reaches exactly max_requests
        // is still admitted.
        if count > self.max_requests {
            log::debug!(
                "rate limit exceeded for {key:?}: {count}/{}",
                self.max_requests
            );
            let retry_after_secs = quota.seconds_until_reset();
            return Ok(Decision::Denied(Denial {
                message: self.message.clone(),
                retry_after_secs,
                quota,
            }));
        }
        Ok(Decision::Allowed(Some(quota)))
    }

    /// The underlying store, for administrative operations such as
    /// [WindowStore::reset] and [WindowStore::clear].
    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(feature = "dashmap")]
#[cfg_attr(docsrs, doc(cfg(feature = "dashmap")))]
impl RateLimiter<InMemoryStore> {
    /// A limiter with the default policy (15 minute window, 100 requests,
    /// peer IP keys) and a fresh [InMemoryStore].
    pub fn new() -> Self {
        Self::builder(InMemoryStore::new()).build()
    }
}

#[cfg(feature = "dashmap")]
impl Default for RateLimiter<InMemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}
