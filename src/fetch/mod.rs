//! The fetch pipeline
//!
//! [`Fetcher`] is the unit every higher-level operation calls: it composes
//! URL validation, the response cache, the rate limiter, a politeness
//! delay, and retry-with-backoff around one network transport call.
//!
//! Order per fetch: validate -> cache lookup (hit returns immediately,
//! bypassing the limiter) -> rate-limiter acquire -> politeness delay ->
//! retried transport call -> cache store (2xx only) -> result.

mod transport;

pub use transport::{build_http_client, FetchRequest, HttpTransport, RawResponse, Transport};

use crate::cache::{fingerprint, CacheStore, MemoryCache, SqliteCache};
use crate::config::{CacheBackend, Config, FetchConfig, LimitBackend};
use crate::limit::{AdaptiveLimiter, RateLimiter, SlidingWindow, TokenBucket};
use crate::retry::RetryExecutor;
use crate::{DriftError, Result};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use rand::Rng;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// A fetched response, either fresh from the wire or served from cache
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub url: Url,
    pub status: u16,
    pub body: Vec<u8>,
    pub headers: HashMap<String, String>,
    pub fetched_at: DateTime<Utc>,
    pub from_cache: bool,
}

impl FetchResult {
    /// The body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The body decoded as JSON.
    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_slice(&self.body).map_err(|e| DriftError::Decode {
            url: self.url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Per-call fetch options
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Extra request headers, merged over the client defaults
    pub headers: HashMap<String, String>,
}

/// Cooperative cancellation signal shared between a caller and a running
/// crawl or batch fetch. Checked between units of work; in-flight requests
/// finish normally.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Shared handle to a cache backend
pub type SharedCache = Arc<Mutex<dyn CacheStore>>;

/// Composed fetch pipeline
///
/// The rate limiter and cache are shared across every concurrent caller of
/// one `Fetcher`; cloning-free sharing is done by wrapping the `Fetcher`
/// itself in an `Arc` (all methods take `&self`).
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    limiter: Arc<dyn RateLimiter>,
    cache: Option<SharedCache>,
    cache_ttl: Duration,
    retry: RetryExecutor,
    config: FetchConfig,
}

impl Fetcher {
    /// Builds a fetcher from configuration: reqwest transport, the
    /// configured rate limiter backend, and the configured cache backend.
    ///
    /// Bad configuration is a programmer error and surfaces here, not
    /// mid-fetch.
    pub fn new(config: &Config) -> Result<Self> {
        crate::config::validate(config)?;
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.fetch)?);
        Ok(Self {
            transport,
            limiter: build_limiter(config),
            cache: build_cache(config)?,
            cache_ttl: Duration::from_secs(config.cache.ttl_secs),
            retry: RetryExecutor::new(config.retry.to_policy()),
            config: config.fetch.clone(),
        })
    }

    /// Replaces the network transport (e.g. a rendered-browser surrogate).
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Replaces the rate limiter.
    pub fn with_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Replaces the cache backend.
    pub fn with_cache(mut self, cache: SharedCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Disables response caching.
    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    /// The rate limiter shared by all fetches through this fetcher.
    pub fn limiter(&self) -> &Arc<dyn RateLimiter> {
        &self.limiter
    }

    /// Fetches a single URL through the full pipeline.
    pub async fn fetch(&self, url: &str) -> Result<FetchResult> {
        self.fetch_with_options(url, &FetchOptions::default()).await
    }

    /// Fetches a single URL with per-call options.
    pub async fn fetch_with_options(
        &self,
        raw_url: &str,
        options: &FetchOptions,
    ) -> Result<FetchResult> {
        let url = crate::url::validate_url(raw_url)?;
        let key = fingerprint(&url, "GET");

        // A cache hit bypasses the rate limiter and retry loop entirely.
        if let Some(hit) = self.cache_lookup(&key, &url) {
            return Ok(hit);
        }

        self.admit(&url).await?;

        let mut request =
            FetchRequest::get(url.clone(), Duration::from_secs(self.config.timeout_secs));
        request.headers.extend(options.headers.clone());

        let response = self.dispatch(&url, &request).await?;

        let result = FetchResult {
            url: url.clone(),
            status: response.status,
            body: response.body,
            headers: response.headers,
            fetched_at: Utc::now(),
            from_cache: false,
        };

        // Only positive results are durable: a throttled or errored response
        // must never satisfy a later lookup.
        if (200..300).contains(&result.status) {
            self.cache_store(&key, &result);
        }

        tracing::info!("Fetched {} ({})", url, result.status);
        Ok(result)
    }

    /// Sends a POST through the rate-limit/retry pipeline.
    ///
    /// POST responses are never cached: the same URL can answer every
    /// submission differently, so only the wire result is returned.
    pub async fn post(&self, url: &str, body: Vec<u8>) -> Result<FetchResult> {
        self.post_with_options(url, body, &FetchOptions::default())
            .await
    }

    /// [`Fetcher::post`] with per-call options.
    pub async fn post_with_options(
        &self,
        raw_url: &str,
        body: Vec<u8>,
        options: &FetchOptions,
    ) -> Result<FetchResult> {
        let url = crate::url::validate_url(raw_url)?;

        self.admit(&url).await?;

        let mut request = FetchRequest::post(
            url.clone(),
            body,
            Duration::from_secs(self.config.timeout_secs),
        );
        request.headers.extend(options.headers.clone());

        let response = self.dispatch(&url, &request).await?;

        let result = FetchResult {
            url: url.clone(),
            status: response.status,
            body: response.body,
            headers: response.headers,
            fetched_at: Utc::now(),
            from_cache: false,
        };

        tracing::info!("Posted to {} ({})", url, result.status);
        Ok(result)
    }

    /// Fetches the URL and writes the response body to `dest`, creating
    /// parent directories as needed. Returns the number of bytes written.
    ///
    /// The body goes through the normal fetch pipeline, so a live cache
    /// entry satisfies the download without touching the network.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let result = self.fetch(url).await?;

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(dest, &result.body)?;

        tracing::info!(
            "Downloaded {} -> {} ({} bytes)",
            result.url,
            dest.display(),
            result.body.len()
        );
        Ok(result.body.len() as u64)
    }

    /// Rate-limit admission followed by the politeness delay.
    async fn admit(&self, url: &Url) -> Result<()> {
        if self.config.blocking_rate_limit {
            self.limiter.acquire(1.0).await;
        } else if !self.limiter.try_acquire(1.0) {
            return Err(DriftError::RateLimitTimeout {
                url: url.to_string(),
            });
        }

        self.politeness_delay().await;
        Ok(())
    }

    /// Retried transport round trip with limiter feedback and status
    /// policy applied per attempt.
    async fn dispatch(&self, url: &Url, request: &FetchRequest) -> Result<RawResponse> {
        let transport = &self.transport;
        let limiter = &self.limiter;
        let url_ref = url;

        self.retry
            .execute(url.as_str(), move || async move {
                let raw = transport.send(request).await?;
                // Server feedback drives the adaptive limiter, success or not.
                limiter.report(raw.status);

                if raw.status >= 400 {
                    return Err(DriftError::HttpStatus {
                        url: url_ref.to_string(),
                        status: raw.status,
                    });
                }
                Ok(raw)
            })
            .await
    }

    /// Fetches the URL and decodes the body as UTF-8 text.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        Ok(self.fetch(url).await?.text())
    }

    /// Fetches the URL and decodes the body as JSON.
    pub async fn fetch_json(&self, url: &str) -> Result<serde_json::Value> {
        self.fetch(url).await?.json()
    }

    /// Fetches a batch of URLs with bounded concurrency.
    ///
    /// Up to `max_concurrent` fetches are in flight at once; every fetch
    /// still runs the full pipeline, so the shared rate limiter keeps the
    /// global budget intact. Failures are isolated: the output is the
    /// subsequence of successes in input order, and
    /// `results.len() < urls.len()` tells the caller something failed
    /// (each failure is also logged).
    pub async fn fetch_many<S: AsRef<str>>(&self, urls: &[S]) -> Vec<FetchResult> {
        self.fetch_many_cancellable(urls, &CancelToken::new()).await
    }

    /// [`Fetcher::fetch_many`] with cooperative cancellation: once `cancel`
    /// fires, no new fetch is started and completed results are returned.
    pub async fn fetch_many_cancellable<S: AsRef<str>>(
        &self,
        urls: &[S],
        cancel: &CancelToken,
    ) -> Vec<FetchResult> {
        let outcomes: Vec<(String, Result<FetchResult>)> = stream::iter(
            urls.iter().map(|u| u.as_ref().to_string()),
        )
        .map(|url| {
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return (url, Err(DriftError::Cancelled));
                }
                let result = self.fetch(&url).await;
                (url, result)
            }
        })
        .buffered(self.config.max_concurrent.max(1))
        .collect()
        .await;

        let mut results = Vec::with_capacity(outcomes.len());
        for (url, outcome) in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(DriftError::Cancelled) => {
                    tracing::debug!("Skipped {} (batch cancelled)", url);
                }
                Err(error) => {
                    tracing::error!("Fetch failed for {}: {}", url, error);
                }
            }
        }
        results
    }

    fn cache_lookup(&self, key: &str, url: &Url) -> Option<FetchResult> {
        let cache = self.cache.as_ref()?;
        let mut store = match cache.lock() {
            Ok(store) => store,
            Err(error) => {
                tracing::warn!("Cache lock poisoned ({}), fetching {}", error, url);
                return None;
            }
        };
        match store.get(key) {
            Ok(Some(mut hit)) => {
                tracing::debug!("Cache hit for {}", url);
                hit.from_cache = true;
                Some(hit)
            }
            Ok(None) => None,
            Err(error) => {
                // Degraded mode: a broken cache backend never fails a fetch.
                tracing::warn!("Cache lookup failed for {} ({}), fetching", url, error);
                None
            }
        }
    }

    fn cache_store(&self, key: &str, result: &FetchResult) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        let mut store = match cache.lock() {
            Ok(store) => store,
            Err(error) => {
                tracing::warn!("Cache lock poisoned ({}), not storing {}", error, result.url);
                return;
            }
        };
        if let Err(error) = store.set(key, result, self.cache_ttl) {
            tracing::warn!("Cache store failed for {} ({})", result.url, error);
        }
    }

    /// Random politeness delay drawn uniformly from the configured range.
    async fn politeness_delay(&self) {
        let (min, max) = self.config.delay_range_secs;
        if max <= 0.0 {
            return;
        }
        let secs = {
            let mut rng = rand::thread_rng();
            rng.gen_range(min..=max)
        };
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }
}

fn build_limiter(config: &Config) -> Arc<dyn RateLimiter> {
    let limit = &config.limit;
    match limit.backend {
        LimitBackend::Adaptive => Arc::new(AdaptiveLimiter::new(
            limit.initial_rps,
            limit.min_rps,
            limit.max_rps,
        )),
        LimitBackend::TokenBucket => {
            Arc::new(TokenBucket::new(limit.initial_rps, limit.burst))
        }
        LimitBackend::SlidingWindow => Arc::new(SlidingWindow::new(
            limit.max_requests,
            Duration::from_secs_f64(limit.window_secs),
        )),
    }
}

fn build_cache(config: &Config) -> Result<Option<SharedCache>> {
    let cache = &config.cache;
    match cache.backend {
        CacheBackend::None => Ok(None),
        CacheBackend::Memory => Ok(Some(
            Arc::new(Mutex::new(MemoryCache::new(cache.maxsize))) as SharedCache,
        )),
        CacheBackend::Sqlite => {
            let store = SqliteCache::new(Path::new(&cache.path), cache.maxsize)?;
            Ok(Some(Arc::new(Mutex::new(store)) as SharedCache))
        }
    }
}
