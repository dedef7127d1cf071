//! Ready-made limiter configurations.
//!
//! Pure configuration data built from the public surface. Each preset owns
//! a fresh [InMemoryStore], so presets never share quota state with each
//! other or with user-built limiters; clone a store into several builders
//! when sharing is actually wanted.

use crate::store::InMemoryStore;
use crate::RateLimiter;
use std::time::Duration;

const PRESET_WINDOW: Duration = Duration::from_secs(15 * 60);

/// General purpose limiter: 100 requests per peer IP per 15 minute window.
pub fn general() -> RateLimiter<InMemoryStore> {
    RateLimiter::builder(InMemoryStore::new())
        .window(PRESET_WINDOW)
        .max_requests(100)
        .message("Too many requests, please try again later.")
        .build()
}

/// Stricter limiter for authentication endpoints: 10 attempts per peer IP
/// per 15 minute window.
pub fn auth() -> RateLimiter<InMemoryStore> {
    RateLimiter::builder(InMemoryStore::new())
        .window(PRESET_WINDOW)
        .max_requests(10)
        .message("Too many authentication attempts, please try again later.")
        .build()
}
