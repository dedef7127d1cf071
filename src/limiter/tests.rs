use crate::limiter::builder::{RETRY_AFTER, X_RATELIMIT_LIMIT};
use crate::limiter::{CallerContext, Decision, RateLimiter, FALLBACK_KEY};
use crate::store::{InMemoryStore, WindowStore};
use crate::KeyExtractorBuilder;
use std::thread;
use std::time::Duration;

const MINUTE: Duration = Duration::from_secs(60);

fn caller(peer: &str) -> CallerContext {
    CallerContext::new().with_peer_addr(peer.parse().unwrap())
}

#[test]
fn admits_up_to_the_limit_and_denies_the_next() {
    let limiter = RateLimiter::builder(InMemoryStore::new())
        .window(MINUTE)
        .max_requests(2)
        .build();
    let context = caller("10.0.0.1:443");

    let first = limiter.check(&context).unwrap();
    assert!(first.is_allowed());
    assert_eq!(first.quota().unwrap().remaining, 1);

    let second = limiter.check(&context).unwrap();
    assert!(second.is_allowed());
    assert_eq!(second.quota().unwrap().remaining, 0);

    match limiter.check(&context).unwrap() {
        Decision::Denied(denial) => {
            assert_eq!(denial.status_code(), 429);
            assert!(denial.retry_after_secs > 0);
            assert_eq!(denial.quota.remaining, 0);
        }
        other => panic!("expected denial, got {other:?}"),
    }
}

#[test]
fn window_resets_after_expiry() {
    let limiter = RateLimiter::builder(InMemoryStore::new())
        .window(Duration::from_millis(100))
        .max_requests(2)
        .build();
    let context = caller("10.0.0.1:443");

    limiter.check(&context).unwrap();
    limiter.check(&context).unwrap();
    thread::sleep(Duration::from_millis(150));

    // First request of a fresh window, not a continuation of the old count.
    let decision = limiter.check(&context).unwrap();
    assert!(decision.is_allowed());
    assert_eq!(decision.quota().unwrap().remaining, 1);
}

#[test]
fn keys_are_isolated() {
    let limiter = RateLimiter::builder(InMemoryStore::new())
        .window(MINUTE)
        .max_requests(1)
        .build();
    let first = caller("10.0.0.1:443");
    let second = caller("10.0.0.2:443");

    assert!(limiter.check(&first).unwrap().is_allowed());
    assert!(limiter.check(&first).unwrap().is_denied());

    // Exhausting one key has no effect on another.
    let decision = limiter.check(&second).unwrap();
    assert!(decision.is_allowed());
    assert_eq!(decision.quota().unwrap().remaining, 0);
}

#[test]
fn unidentifiable_callers_share_the_fallback_key() {
    let store = InMemoryStore::new();
    let limiter = RateLimiter::builder(store.clone())
        .window(MINUTE)
        .max_requests(1)
        .build();

    // No peer address, no identity: processed, not failed.
    assert!(limiter.check(&CallerContext::new()).unwrap().is_allowed());
    // A second anonymous caller lands in the same bucket.
    assert!(limiter.check(&CallerContext::new()).unwrap().is_denied());

    let (count, _) = store.peek(FALLBACK_KEY).unwrap().unwrap();
    assert_eq!(count, 2);
}

#[test]
fn skipped_requests_touch_no_window() {
    let store = InMemoryStore::new();
    let limiter = RateLimiter::builder(store.clone())
        .window(MINUTE)
        .max_requests(1)
        .skip(|context| context.identity() == Some("healthcheck"))
        .build();
    let exempt = CallerContext::new().with_identity("healthcheck");

    for _ in 0..3 {
        let decision = limiter.check(&exempt).unwrap();
        assert!(decision.is_allowed());
        assert!(decision.quota().is_none());
    }
    // No window was created for the would-be key.
    assert!(store.peek(FALLBACK_KEY).unwrap().is_none());
}

#[test]
fn denied_requests_still_consume_a_slot() {
    let store = InMemoryStore::new();
    let limiter = RateLimiter::builder(store.clone())
        .window(MINUTE)
        .max_requests(1)
        .build();
    let context = caller("10.0.0.9:8080");

    assert!(limiter.check(&context).unwrap().is_allowed());
    for _ in 0..3 {
        assert!(limiter.check(&context).unwrap().is_denied());
    }

    // The count keeps growing past the limit while remaining clamps at 0.
    let (count, _) = store.peek("10.0.0.9").unwrap().unwrap();
    assert_eq!(count, 4);
}

#[test]
fn concurrent_checks_admit_exactly_the_limit() {
    const CALLERS: usize = 16;
    let limiter = RateLimiter::builder(InMemoryStore::new())
        .window(MINUTE)
        .max_requests(CALLERS as u64)
        .build();
    let context = caller("10.1.1.1:80");

    thread::scope(|s| {
        let handles: Vec<_> = (0..CALLERS)
            .map(|_| s.spawn(|| limiter.check(&context).unwrap().is_allowed()))
            .collect();
        let allowed = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|&allowed| allowed)
            .count();
        assert_eq!(allowed, CALLERS);
    });

    // The window is now exactly full.
    assert!(limiter.check(&context).unwrap().is_denied());
}

#[test]
fn headers_reflect_the_producing_count() {
    let limiter = RateLimiter::builder(InMemoryStore::new())
        .window(MINUTE)
        .max_requests(3)
        .build();
    let context = caller("10.0.0.1:443");

    for expected_remaining in [2u64, 1, 0] {
        let decision = limiter.check(&context).unwrap();
        let quota = decision.quota().unwrap();
        assert_eq!(quota.remaining, expected_remaining);
        let headers = quota.headers();
        assert_eq!(headers[0], (X_RATELIMIT_LIMIT, "3".to_string()));
        assert_eq!(headers[1].1, expected_remaining.to_string());
    }

    match limiter.check(&context).unwrap() {
        Decision::Denied(denial) => {
            let headers = denial.headers();
            assert_eq!(headers[1].1, "0");
            assert_eq!(headers[3].0, RETRY_AFTER);
            assert_eq!(headers[3].1, denial.retry_after_secs.to_string());
        }
        other => panic!("expected denial, got {other:?}"),
    }
}

#[test]
fn custom_key_strategies_are_swappable() {
    let limiter = RateLimiter::builder(InMemoryStore::new())
        .window(MINUTE)
        .max_requests(1)
        .key_extractor(KeyExtractorBuilder::new().identity_key().build())
        .build();
    let tenant_a = CallerContext::new().with_identity("tenant-a");
    let tenant_b = CallerContext::new().with_identity("tenant-b");

    assert!(limiter.check(&tenant_a).unwrap().is_allowed());
    assert!(limiter.check(&tenant_a).unwrap().is_denied());
    // Keyed per tenant, not per peer.
    assert!(limiter.check(&tenant_b).unwrap().is_allowed());
}

#[test]
fn zero_argument_construction_uses_defaults() {
    let limiter = RateLimiter::new();
    let decision = limiter.check(&caller("10.0.0.1:443")).unwrap();
    let quota = decision.quota().unwrap();
    assert_eq!(quota.limit, 100);
    assert_eq!(quota.remaining, 99);
    assert!(quota.seconds_until_reset() > 0);
}

#[test]
fn administrative_reset_clears_one_key() {
    let limiter = RateLimiter::builder(InMemoryStore::new())
        .window(MINUTE)
        .max_requests(1)
        .build();
    let context = caller("10.0.0.1:443");

    assert!(limiter.check(&context).unwrap().is_allowed());
    assert!(limiter.check(&context).unwrap().is_denied());

    limiter.store().reset("10.0.0.1").unwrap();
    assert!(limiter.check(&context).unwrap().is_allowed());
}
