//! Rate limiting for outbound requests
//!
//! This module decides when the next request may go out. Three limiters are
//! provided behind one trait:
//! - [`TokenBucket`]: continuous refill, allows short bursts
//! - [`SlidingWindow`]: at most N requests per trailing time window
//! - [`AdaptiveLimiter`]: token bucket whose rate hill-climbs from server
//!   feedback (halves on HTTP 429, creeps up on success)
//!
//! All limiter state is internally locked; one limiter instance is shared
//! across every concurrent worker in the process. Blocking waits never hold
//! the internal lock: the wait duration is computed under the lock, the lock
//! is released, and admission is re-checked after sleeping.

mod adaptive;
mod sliding_window;
mod token_bucket;

pub use adaptive::AdaptiveLimiter;
pub use sliding_window::SlidingWindow;
pub use token_bucket::TokenBucket;

use async_trait::async_trait;

/// Admission control for outbound requests
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Waits until `cost` units of budget are available, then consumes them.
    ///
    /// Always returns `true`; the return value exists so blocking and
    /// non-blocking acquisition share a contract.
    async fn acquire(&self, cost: f64) -> bool;

    /// Consumes `cost` units if available right now, without waiting.
    ///
    /// Returns `false` and leaves the budget untouched (beyond the
    /// elapsed-time refill) when the budget is insufficient.
    fn try_acquire(&self, cost: f64) -> bool;

    /// Feeds an observed response status back into the limiter.
    ///
    /// Non-adaptive limiters ignore this.
    fn report(&self, _status_code: u16) {}

    /// The current steady-state rate in requests per second.
    fn current_rate(&self) -> f64;
}
