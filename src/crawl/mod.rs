//! Breadth-first, domain-scoped crawling
//!
//! The [`Crawler`] drives a [`Frontier`] of discovered URLs through the
//! fetch pipeline: pop the earliest-enqueued URL, fetch and parse it,
//! resolve its outbound links, apply the domain boundary and any caller
//! filter, and enqueue what has not been seen. Pages come back in strict
//! discovery (BFS) order, bounded by `max_pages`.
//!
//! Per-URL fetch or parse errors are non-fatal: they are logged, recorded
//! in the outcome, and the crawl continues. The frontier's seen set keeps a
//! failed URL from being re-queued within the same crawl.

mod frontier;

pub use frontier::Frontier;

use crate::fetch::{CancelToken, Fetcher};
use crate::parse::{parse_document, Document};
use crate::url::same_netloc;
use crate::Result;
use url::Url;

/// Caller-supplied predicate deciding whether a discovered link is followed
pub type LinkFilter = Box<dyn Fn(&Url) -> bool + Send + Sync>;

/// Options for one crawl invocation
pub struct CrawlOptions {
    /// Stop after this many successfully crawled pages
    pub max_pages: usize,

    /// Only follow links whose network location matches the start URL
    pub same_domain: bool,

    /// Optional additional link predicate
    pub link_filter: Option<LinkFilter>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_pages: 10,
            same_domain: true,
            link_filter: None,
        }
    }
}

/// One successfully crawled page, in discovery order
#[derive(Debug, Clone)]
pub struct CrawledPage {
    pub url: Url,
    pub document: Document,
}

/// A page that failed to fetch or parse during the crawl
#[derive(Debug, Clone)]
pub struct CrawlFailure {
    pub url: Url,
    pub error: String,
}

/// How a crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStatus {
    /// Frontier exhausted or page budget reached
    Completed,
    /// Caller cancelled via [`CancelToken`]
    Aborted,
}

/// Everything a crawl produced
///
/// `failures` keeps the fact that a page failed distinguishable from a page
/// that legitimately had zero links.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub pages: Vec<CrawledPage>,
    pub failures: Vec<CrawlFailure>,
    pub status: CrawlStatus,
}

/// Breadth-first crawler over one fetch pipeline
///
/// The frontier and its seen set are exclusively owned by one `crawl` call
/// and discarded when that crawl ends; the rate limiter and cache inside
/// the [`Fetcher`] are shared process-wide state.
pub struct Crawler {
    fetcher: Fetcher,
}

impl Crawler {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Crawls breadth-first from `start_url`.
    pub async fn crawl(&self, start_url: &str, options: &CrawlOptions) -> Result<CrawlOutcome> {
        self.crawl_cancellable(start_url, options, &CancelToken::new())
            .await
    }

    /// [`Crawler::crawl`] with cooperative cancellation, checked between
    /// frontier pops. Cancellation returns whatever completed so far with
    /// `CrawlStatus::Aborted`; shared limiter/cache state stays intact.
    pub async fn crawl_cancellable(
        &self,
        start_url: &str,
        options: &CrawlOptions,
        cancel: &CancelToken,
    ) -> Result<CrawlOutcome> {
        // A bad start URL is a caller bug, surfaced before any work happens.
        let start = crate::url::validate_url(start_url)?;

        let mut frontier = Frontier::new();
        frontier.push(start.clone());

        let mut pages: Vec<CrawledPage> = Vec::new();
        let mut failures: Vec<CrawlFailure> = Vec::new();
        let mut status = CrawlStatus::Completed;

        while let Some(url) = frontier.pop() {
            if pages.len() >= options.max_pages {
                tracing::info!("Page budget of {} reached", options.max_pages);
                break;
            }
            if cancel.is_cancelled() {
                tracing::info!("Crawl cancelled after {} pages", pages.len());
                status = CrawlStatus::Aborted;
                break;
            }

            tracing::debug!("Crawling {}", url);
            let result = match self.fetcher.fetch(url.as_str()).await {
                Ok(result) => result,
                Err(error) => {
                    // Non-fatal: record and move on. The frontier's seen set
                    // already prevents this URL from being re-queued.
                    tracing::error!("Crawl error for {}: {}", url, error);
                    failures.push(CrawlFailure {
                        url,
                        error: error.to_string(),
                    });
                    continue;
                }
            };

            let document = parse_document(&result.text(), &url);

            for link in &document.links {
                if options.same_domain && !same_netloc(&start, link) {
                    tracing::trace!("Skipping off-domain link {}", link);
                    continue;
                }
                if let Some(filter) = &options.link_filter {
                    if !filter(link) {
                        continue;
                    }
                }
                frontier.push(link.clone());
            }

            pages.push(CrawledPage { url, document });
        }

        tracing::info!(
            "Crawl finished: {} pages, {} failures, {} URLs seen",
            pages.len(),
            failures.len(),
            frontier.seen_count()
        );

        Ok(CrawlOutcome {
            pages,
            failures,
            status,
        })
    }
}
