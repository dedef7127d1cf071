use crate::limiter::key::KeyExtractorBuilder;
use crate::limiter::{CallerContext, Denial, KeyExtractorFn, QuotaStatus, RateLimiter, SkipFn};
use crate::store::WindowStore;
use std::sync::Arc;
use std::time::Duration;

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";
pub const RETRY_AFTER: &str = "retry-after";

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_MAX_REQUESTS: u64 = 100;
pub const DEFAULT_MESSAGE: &str = "Too many requests, please try again later.";

/// Configures and builds a [RateLimiter].
///
/// Every parameter has a usable default, so `RateLimiter::builder(store)`
/// followed by `build()` yields a working limiter.
pub struct RateLimiterBuilder<S> {
    store: S,
    window: Duration,
    max_requests: u64,
    message: String,
    key_extractor: Arc<KeyExtractorFn>,
    skip: Arc<SkipFn>,
}

impl<S> RateLimiterBuilder<S>
where
    S: WindowStore,
{
    pub(super) fn new(store: S) -> Self {
        Self {
            store,
            window: DEFAULT_WINDOW,
            max_requests: DEFAULT_MAX_REQUESTS,
            message: DEFAULT_MESSAGE.to_owned(),
            key_extractor: Arc::new(KeyExtractorBuilder::new().peer_ip_key().build()),
            skip: Arc::new(|_| false),
        }
    }

    /// Duration of the counting window.
    ///
    /// Defaults to 15 minutes.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Requests permitted per key within one window.
    ///
    /// Defaults to 100.
    pub fn max_requests(mut self, max_requests: u64) -> Self {
        self.max_requests = max_requests;
        self
    }

    /// Message carried in the denial payload.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Replaces the default key extraction strategy (peer IP).
    ///
    /// See [KeyExtractorBuilder] for composing a strategy from request
    /// attributes. Extractors must not fail; degrade to
    /// [FALLBACK_KEY](crate::FALLBACK_KEY) when an identity cannot be
    /// resolved.
    pub fn key_extractor<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&CallerContext) -> String + Send + Sync + 'static,
    {
        self.key_extractor = Arc::new(extractor);
        self
    }

    /// Per-request exemption predicate. Exempted requests are allowed
    /// without touching any window and carry no quota metadata.
    ///
    /// Defaults to never skip.
    pub fn skip<F>(mut self, skip: F) -> Self
    where
        F: Fn(&CallerContext) -> bool + Send + Sync + 'static,
    {
        self.skip = Arc::new(skip);
        self
    }

    /// # Panics
    ///
    /// Panics if the window duration or the request ceiling is zero.
    pub fn build(self) -> RateLimiter<S> {
        assert!(!self.window.is_zero(), "window duration must be non-zero");
        assert!(self.max_requests > 0, "max_requests must be non-zero");
        RateLimiter {
            store: self.store,
            window: self.window,
            max_requests: self.max_requests,
            message: self.message,
            key_extractor: self.key_extractor,
            skip: self.skip,
        }
    }
}

impl QuotaStatus {
    /// Conventional rate limit headers for this quota state:
    /// `x-ratelimit-limit`, `x-ratelimit-remaining` and
    /// `x-ratelimit-reset` (as Unix epoch seconds).
    pub fn headers(&self) -> [(&'static str, String); 3] {
        [
            (X_RATELIMIT_LIMIT, self.limit.to_string()),
            (X_RATELIMIT_REMAINING, self.remaining.to_string()),
            (X_RATELIMIT_RESET, self.reset_epoch_seconds().to_string()),
        ]
    }
}

impl Denial {
    /// [QuotaStatus::headers] plus `retry-after`.
    pub fn headers(&self) -> [(&'static str, String); 4] {
        let [limit, remaining, reset] = self.quota.headers();
        [
            limit,
            remaining,
            reset,
            (RETRY_AFTER, self.retry_after_secs.to_string()),
        ]
    }
}
