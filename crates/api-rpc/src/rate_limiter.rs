//! Request throttling
//!
//! `RateLimiter` is a global token bucket over every RPC call.
//! `LoginThrottle` counts failed logins per account identifier inside a
//! sliding window.

use kissan_core::application::normalize_identifier;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Token bucket with lock-free refill
pub struct RateLimiter {
    // Upper 32 bits: tokens. Lower 32 bits: last refill (ms since `created`,
    // modulo 2^32).
    packed: AtomicU64,
    created: Instant,
    max_tokens: u32,
    refill_per_sec: u32,
}

impl RateLimiter {
    /// `RateLimiter::new(200, 100)` allows bursts of 200 and 100 req/sec sustained
    pub fn new(max_tokens: u32, refill_per_sec: u32) -> Self {
        Self {
            packed: AtomicU64::new((max_tokens as u64) << 32),
            created: Instant::now(),
            max_tokens,
            refill_per_sec,
        }
    }

    /// Take one token; false when the bucket is empty
    pub fn check(&self) -> bool {
        self.check_at(self.created.elapsed().as_millis() as u64)
    }

    fn check_at(&self, elapsed_ms: u64) -> bool {
        // Stamps wrap every ~49 days; wrapping_sub keeps the delta right
        let elapsed_ms = elapsed_ms as u32;
        loop {
            let packed = self.packed.load(Ordering::Acquire);
            let tokens = (packed >> 32) as u32;
            let last_refill_ms = (packed & 0xFFFF_FFFF) as u32;

            let refill =
                (elapsed_ms.wrapping_sub(last_refill_ms) as u64 * self.refill_per_sec as u64) / 1000;
            let available = (tokens as u64 + refill).min(self.max_tokens as u64) as u32;

            // Keep the old timestamp until a whole token has accrued
            let stamp = if refill > 0 { elapsed_ms } else { last_refill_ms };

            if available == 0 {
                let _ = self.packed.compare_exchange(
                    packed,
                    stamp as u64,
                    Ordering::Release,
                    Ordering::Acquire,
                );
                return false;
            }

            let next = (((available - 1) as u64) << 32) | stamp as u64;
            if self
                .packed
                .compare_exchange(packed, next, Ordering::Release, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }
}

/// Failed-login counter keyed by normalized identifier, so every spelling of
/// one mobile number shares a bucket
pub struct LoginThrottle {
    max_attempts: u32,
    window: Duration,
    failures: Mutex<HashMap<String, Vec<Instant>>>,
}

impl LoginThrottle {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            window,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Whether another attempt for `identifier` may proceed
    pub async fn allows(&self, identifier: &str) -> bool {
        self.allows_at(identifier, Instant::now()).await
    }

    pub async fn record_failure(&self, identifier: &str) {
        self.record_failure_at(identifier, Instant::now()).await
    }

    /// Successful login forgets earlier failures
    pub async fn clear(&self, identifier: &str) {
        self.failures.lock().await.remove(&key(identifier));
    }

    async fn allows_at(&self, identifier: &str, now: Instant) -> bool {
        let mut failures = self.failures.lock().await;
        let key = key(identifier);
        let Some(attempts) = failures.get_mut(&key) else {
            return true;
        };
        attempts.retain(|t| now.duration_since(*t) < self.window);
        if attempts.is_empty() {
            failures.remove(&key);
            return true;
        }
        attempts.len() < self.max_attempts as usize
    }

    async fn record_failure_at(&self, identifier: &str, now: Instant) {
        let mut failures = self.failures.lock().await;
        // Drop every expired bucket, not just this one
        failures.retain(|_, attempts| {
            attempts.retain(|t| now.duration_since(*t) < self.window);
            !attempts.is_empty()
        });
        failures.entry(key(identifier)).or_default().push(now);
    }
}

fn key(identifier: &str) -> String {
    normalize_identifier(identifier).to_lowercase()
}
