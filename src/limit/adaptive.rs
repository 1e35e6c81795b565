//! Adaptive rate limiter driven by server feedback

use crate::limit::{RateLimiter, TokenBucket};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

/// Multiplicative step applied to the rate after a sub-400 response.
const RECOVERY_FACTOR: f64 = 1.1;

/// Rate cut applied when the server answers HTTP 429.
const THROTTLE_FACTOR: f64 = 0.5;

/// Bucket capacity relative to the current rate (burst headroom).
const BURST_FACTOR: f64 = 2.0;

/// Token bucket whose rate adapts to what the remote host tolerates.
///
/// Every completed fetch calls [`RateLimiter::report`] with the observed
/// status code. A 429 halves the current rate (floored at `min_rps`) and
/// rebuilds the bucket; any status below 400 nudges the rate up by 10%
/// (capped at `max_rps`). The result hill-climbs toward the fastest rate the
/// server accepts and backs off sharply on explicit throttling.
pub struct AdaptiveLimiter {
    min_rps: f64,
    max_rps: f64,
    inner: RwLock<Inner>,
}

struct Inner {
    current_rps: f64,
    bucket: Arc<TokenBucket>,
}

impl AdaptiveLimiter {
    pub fn new(initial_rps: f64, min_rps: f64, max_rps: f64) -> Self {
        assert!(min_rps > 0.0, "min_rps must be positive");
        assert!(min_rps <= max_rps, "min_rps must not exceed max_rps");
        let clamped = initial_rps.clamp(min_rps, max_rps);
        Self {
            min_rps,
            max_rps,
            inner: RwLock::new(Inner {
                current_rps: clamped,
                bucket: Arc::new(TokenBucket::new(clamped, clamped * BURST_FACTOR)),
            }),
        }
    }

    fn rebuild(&self, new_rps: f64) {
        let mut inner = self.inner.write().unwrap();
        inner.current_rps = new_rps;
        inner.bucket = Arc::new(TokenBucket::new(new_rps, new_rps * BURST_FACTOR));
    }

    /// Snapshot of the active bucket; taken so the read lock is never held
    /// across a sleep inside `acquire`.
    fn bucket(&self) -> Arc<TokenBucket> {
        Arc::clone(&self.inner.read().unwrap().bucket)
    }
}

#[async_trait]
impl RateLimiter for AdaptiveLimiter {
    async fn acquire(&self, cost: f64) -> bool {
        self.bucket().acquire(cost).await
    }

    fn try_acquire(&self, cost: f64) -> bool {
        self.bucket().try_acquire(cost)
    }

    fn report(&self, status_code: u16) {
        let current = self.current_rate();

        if status_code == 429 {
            let new_rps = (current * THROTTLE_FACTOR).max(self.min_rps);
            self.rebuild(new_rps);
            tracing::warn!(
                "Server throttled us (429), reducing rate {:.2} -> {:.2} rps",
                current,
                new_rps
            );
        } else if status_code < 400 {
            let new_rps = (current * RECOVERY_FACTOR).min(self.max_rps);
            if new_rps > current {
                self.rebuild(new_rps);
                tracing::debug!("Raising rate {:.2} -> {:.2} rps", current, new_rps);
            }
        }
        // 4xx/5xx other than 429 carry no throttling signal; leave the rate.
    }

    fn current_rate(&self) -> f64 {
        self.inner.read().unwrap().current_rps
    }
}
