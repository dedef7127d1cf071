//! Per-key fixed window rate limiting.
//!
//! A [RateLimiter] counts the requests attributable to a caller identity
//! within a rolling window and denies callers exceeding their quota,
//! reporting the metadata (`x-ratelimit-*`, `retry-after`) that the host
//! request-handling layer turns into response headers and HTTP 429s.
//!
//! ```
//! use fixed_window_limiter::store::InMemoryStore;
//! use fixed_window_limiter::{CallerContext, RateLimiter};
//! use std::time::Duration;
//!
//! let limiter = RateLimiter::builder(InMemoryStore::new())
//!     .window(Duration::from_secs(60))
//!     .max_requests(2)
//!     .build();
//!
//! let caller = CallerContext::new().with_peer_addr("203.0.113.7:443".parse().unwrap());
//! let decision = limiter.check(&caller).unwrap();
//! assert!(decision.is_allowed());
//! assert_eq!(decision.quota().unwrap().remaining, 1);
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod store;

mod limiter;
#[cfg(feature = "dashmap")]
#[cfg_attr(docsrs, doc(cfg(feature = "dashmap")))]
pub mod presets;

pub use limiter::builder::{
    RateLimiterBuilder, RETRY_AFTER, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET,
};
pub use limiter::{
    CallerContext, Decision, Denial, KeyExtractorBuilder, KeyExtractorFn, QuotaStatus, RateLimiter,
    SkipFn, FALLBACK_KEY,
};
