//! Sliding window rate limiter

use crate::limit::RateLimiter;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sliding window limiter: admits a request while fewer than `max_requests`
/// timestamps fall inside the trailing `window`.
///
/// Each admission records a timestamp; timestamps older than the window are
/// discarded on every acquisition attempt. When the window is full, the wait
/// is exactly the time until the oldest timestamp slides out.
#[derive(Debug)]
pub struct SlidingWindow {
    max_requests: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl SlidingWindow {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        assert!(max_requests > 0, "sliding window needs at least one slot");
        assert!(!window.is_zero(), "sliding window duration must be non-zero");
        Self {
            max_requests,
            window,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Requests currently counted inside the window.
    pub fn in_flight(&self) -> usize {
        let mut timestamps = self.timestamps.lock().unwrap();
        Self::evict_expired(&mut timestamps, self.window, Instant::now());
        timestamps.len()
    }

    fn evict_expired(timestamps: &mut VecDeque<Instant>, window: Duration, now: Instant) {
        while let Some(oldest) = timestamps.front() {
            if now.duration_since(*oldest) >= window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Records an admission if a slot is free; otherwise returns the wait
    /// until the oldest recorded request exits the window.
    fn admit_or_wait(&self) -> Option<Duration> {
        let now = Instant::now();
        let mut timestamps = self.timestamps.lock().unwrap();
        Self::evict_expired(&mut timestamps, self.window, now);

        if timestamps.len() < self.max_requests {
            timestamps.push_back(now);
            None
        } else {
            // Front element exists because max_requests > 0.
            let oldest = *timestamps.front().unwrap();
            let elapsed = now.duration_since(oldest);
            Some(self.window.saturating_sub(elapsed))
        }
    }
}

#[async_trait]
impl RateLimiter for SlidingWindow {
    async fn acquire(&self, _cost: f64) -> bool {
        loop {
            match self.admit_or_wait() {
                None => return true,
                Some(wait) => {
                    tracing::trace!("Sliding window full, waiting {:?}", wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    fn try_acquire(&self, _cost: f64) -> bool {
        self.admit_or_wait().is_none()
    }

    fn current_rate(&self) -> f64 {
        self.max_requests as f64 / self.window.as_secs_f64()
    }
}
