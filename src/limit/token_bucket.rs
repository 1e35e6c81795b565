//! Token bucket rate limiter

use crate::limit::RateLimiter;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Token bucket: tokens refill continuously at `rate` per second, capped at
/// `capacity`. Acquisition deducts tokens; refill happens lazily from
/// elapsed wall-clock time.
///
/// Invariant: `0 <= tokens <= capacity` at every observation point. A
/// blocking [`RateLimiter::acquire`] that finds the bucket short computes the
/// deficit wait outside the lock, sleeps, and re-checks, so concurrent
/// callers can never double-spend the same tokens.
#[derive(Debug)]
pub struct TokenBucket {
    rate: f64,
    capacity: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a bucket that starts full.
    ///
    /// `rate` and `capacity` must be positive; construction is a programmer
    /// decision, so violations panic rather than surface as runtime errors.
    pub fn new(rate: f64, capacity: f64) -> Self {
        assert!(rate > 0.0, "token bucket rate must be positive");
        assert!(capacity > 0.0, "token bucket capacity must be positive");
        Self {
            rate,
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// The configured refill rate in tokens per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Tokens currently available, after applying the lazy refill.
    pub fn available(&self) -> f64 {
        let mut state = self.state.lock().unwrap();
        self.refill(&mut state, Instant::now());
        state.tokens
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity);
        state.last_refill = now;
    }

    /// Deducts `cost` if available; otherwise returns the wait until the
    /// deficit would refill. Runs entirely under the lock.
    fn take_or_wait(&self, cost: f64) -> Option<Duration> {
        let mut state = self.state.lock().unwrap();
        self.refill(&mut state, Instant::now());

        if state.tokens >= cost {
            state.tokens -= cost;
            None
        } else {
            let deficit = cost - state.tokens;
            Some(Duration::from_secs_f64(deficit / self.rate))
        }
    }

    #[cfg(test)]
    fn backdate_last_refill(&self, by: Duration) {
        let mut state = self.state.lock().unwrap();
        state.last_refill -= by;
    }

    #[cfg(test)]
    fn drain(&self) {
        let mut state = self.state.lock().unwrap();
        state.tokens = 0.0;
        state.last_refill = Instant::now();
    }
}

#[async_trait]
impl RateLimiter for TokenBucket {
    async fn acquire(&self, cost: f64) -> bool {
        loop {
            match self.take_or_wait(cost) {
                None => return true,
                Some(wait) => {
                    tracing::trace!("Token bucket short, waiting {:?}", wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    fn try_acquire(&self, cost: f64) -> bool {
        self.take_or_wait(cost).is_none()
    }

    fn current_rate(&self) -> f64 {
        self.rate
    }
}
