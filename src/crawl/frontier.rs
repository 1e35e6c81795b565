//! Crawl frontier: FIFO queue of discovered URLs with enqueue-time dedup

use std::collections::{HashSet, VecDeque};
use url::Url;

/// The queue of discovered-but-not-yet-fetched URLs driving a
/// breadth-first crawl.
///
/// A URL is enqueued at most once per crawl: `push` checks against
/// everything ever enqueued (visited or still pending), and the seen set
/// only grows for the lifetime of the crawl. FIFO pop order gives
/// breadth-first traversal.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<Url>,
    seen: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a URL unless it was already enqueued during this crawl.
    /// Returns whether the URL was accepted.
    pub fn push(&mut self, url: Url) -> bool {
        if self.seen.insert(url.as_str().to_string()) {
            self.queue.push_back(url);
            true
        } else {
            false
        }
    }

    /// Pops the earliest-enqueued URL.
    pub fn pop(&mut self) -> Option<Url> {
        self.queue.pop_front()
    }

    /// URLs waiting to be fetched.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Distinct URLs ever enqueued.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
