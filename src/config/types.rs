use serde::Deserialize;

/// Main configuration structure for Driftnet
///
/// Every section has working defaults, so a config file only needs to name
/// the values it changes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub limit: LimitConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub crawl: CrawlConfig,
}

/// Fetch pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Politeness delay range in seconds, drawn uniformly before each
    /// network request
    #[serde(rename = "delay-range-secs")]
    pub delay_range_secs: (f64, f64),

    /// Whether a fetch waits for rate-limit capacity (true) or fails
    /// immediately when none is available (false)
    #[serde(rename = "blocking-rate-limit")]
    pub blocking_rate_limit: bool,

    /// Maximum in-flight requests for batch fetches
    #[serde(rename = "max-concurrent")]
    pub max_concurrent: usize,

    /// Optional proxy URL applied to all requests
    pub proxy: Option<String>,

    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            delay_range_secs: (1.0, 3.0),
            blocking_rate_limit: true,
            max_concurrent: 10,
            proxy: None,
            user_agent: UserAgentConfig::default(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the client
    pub name: String,

    /// Version of the client
    pub version: String,

    /// URL with information about the client
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for client-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            name: "driftnet".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/driftnet".to_string(),
            contact_email: "ops@example.com".to_string(),
        }
    }
}

/// Rate limiter backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LimitBackend {
    /// Token bucket whose refill rate reacts to server feedback
    Adaptive,
    /// Fixed-rate token bucket
    TokenBucket,
    /// At most `max-requests` per rolling `window-secs`
    SlidingWindow,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    pub backend: LimitBackend,

    /// Starting request rate in requests per second
    #[serde(rename = "initial-rps")]
    pub initial_rps: f64,

    /// Floor the adaptive limiter never throttles below
    #[serde(rename = "min-rps")]
    pub min_rps: f64,

    /// Ceiling the adaptive limiter never recovers above
    #[serde(rename = "max-rps")]
    pub max_rps: f64,

    /// Token bucket capacity (burst size)
    pub burst: f64,

    /// Sliding window length in seconds
    #[serde(rename = "window-secs")]
    pub window_secs: f64,

    /// Sliding window request budget
    #[serde(rename = "max-requests")]
    pub max_requests: usize,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            backend: LimitBackend::Adaptive,
            initial_rps: 2.0,
            min_rps: 0.1,
            max_rps: 10.0,
            burst: 4.0,
            window_secs: 1.0,
            max_requests: 2,
        }
    }
}

/// Retry and backoff configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Delay before the first retry, in seconds
    #[serde(rename = "base-delay-secs")]
    pub base_delay_secs: f64,

    /// Upper bound on any single backoff sleep, in seconds
    #[serde(rename = "max-delay-secs")]
    pub max_delay_secs: f64,

    /// Growth factor per attempt
    #[serde(rename = "exponential-base")]
    pub exponential_base: f64,

    /// HTTP statuses worth retrying
    #[serde(rename = "retryable-statuses")]
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = crate::retry::RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            base_delay_secs: policy.base_delay.as_secs_f64(),
            max_delay_secs: policy.max_delay.as_secs_f64(),
            exponential_base: policy.exponential_base,
            retryable_statuses: policy.retryable_statuses,
        }
    }
}

impl RetryConfig {
    /// Converts the serialized form into the policy the executor runs.
    pub fn to_policy(&self) -> crate::retry::RetryPolicy {
        crate::retry::RetryPolicy {
            max_retries: self.max_retries,
            base_delay: std::time::Duration::from_secs_f64(self.base_delay_secs),
            max_delay: std::time::Duration::from_secs_f64(self.max_delay_secs),
            exponential_base: self.exponential_base,
            retryable_statuses: self.retryable_statuses.clone(),
        }
    }
}

/// Cache backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheBackend {
    /// Caching disabled
    None,
    /// In-process LRU map
    Memory,
    /// SQLite file, persistent across runs
    Sqlite,
}

/// Response cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,

    /// Maximum number of cached responses before LRU eviction
    pub maxsize: usize,

    /// Entry time-to-live in seconds
    #[serde(rename = "ttl-secs")]
    pub ttl_secs: u64,

    /// SQLite database path (sqlite backend only)
    pub path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            maxsize: 128,
            ttl_secs: 3600,
            path: "driftnet-cache.db".to_string(),
        }
    }
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Maximum successfully crawled pages per crawl
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Whether to stay on the start URL's domain
    #[serde(rename = "same-domain")]
    pub same_domain: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 10,
            same_domain: true,
        }
    }
}
