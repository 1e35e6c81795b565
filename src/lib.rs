//! Driftnet: a polite web fetching and crawling toolkit
//!
//! This crate implements a configurable fetch/crawl engine: URLs are fetched
//! through an adaptive rate limiter, a retry-with-backoff layer, and a TTL
//! response cache, and a breadth-first crawler walks link graphs inside a
//! domain boundary on top of that pipeline.

pub mod cache;
pub mod config;
pub mod crawl;
pub mod export;
pub mod fetch;
pub mod limit;
pub mod parse;
pub mod retry;
pub mod url;

use thiserror::Error;

/// Main error type for Driftnet operations
#[derive(Debug, Error)]
pub enum DriftError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid URL: {0}")]
    Validation(#[from] UrlError),

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("All {attempts} attempts failed for {url}: {source}")]
    ExhaustedRetries {
        url: String,
        attempts: u32,
        #[source]
        source: Box<DriftError>,
    },

    #[error("Rate limiter denied request for {url}")]
    RateLimitTimeout { url: String },

    #[error("Cache backend error: {0}")]
    Cache(#[from] CacheError),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Failed to decode response body for {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Export error: {0}")]
    Export(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriftError {
    /// Returns true if a retry may succeed for this error.
    ///
    /// Transport failures and timeouts are always retryable. HTTP status
    /// errors are retryable only if the status is in `retryable_statuses`
    /// (429 and 5xx by default). Everything else fails fast.
    pub fn is_retryable(&self, retryable_statuses: &[u16]) -> bool {
        match self {
            DriftError::Transport { .. } | DriftError::Timeout { .. } => true,
            DriftError::HttpStatus { status, .. } => retryable_statuses.contains(status),
            _ => false,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Disallowed URL scheme: {0}")]
    DisallowedScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Cache backend errors
///
/// These never abort a fetch on their own: the Fetcher logs and degrades to
/// no-cache mode when the backend misbehaves.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Backend(String),

    #[error("Failed to encode cache entry: {0}")]
    Encode(String),
}

/// Result type alias for Driftnet operations
pub type Result<T> = std::result::Result<T, DriftError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use cache::{CacheStore, MemoryCache, SqliteCache};
pub use config::Config;
pub use crawl::{CrawlOptions, CrawlOutcome, CrawlStatus, Crawler};
pub use export::{CsvExporter, Exporter, JsonExporter, Record, SqliteExporter};
pub use fetch::{CancelToken, FetchOptions, FetchResult, Fetcher};
pub use limit::{AdaptiveLimiter, RateLimiter, SlidingWindow, TokenBucket};
pub use parse::Document;
pub use retry::{RetryExecutor, RetryPolicy};
pub use crate::url::{extract_domain, same_netloc, validate_url};
