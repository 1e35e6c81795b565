use crate::config::types::{
    CacheBackend, CacheConfig, Config, FetchConfig, LimitBackend, LimitConfig, RetryConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetch_config(&config.fetch)?;
    validate_user_agent_config(&config.fetch.user_agent)?;
    validate_limit_config(&config.limit)?;
    validate_retry_config(&config.retry)?;
    validate_cache_config(&config.cache)?;
    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    let (min, max) = config.delay_range_secs;
    if min < 0.0 || max < 0.0 || min > max {
        return Err(ConfigError::Validation(format!(
            "delay-range-secs must satisfy 0 <= min <= max, got [{}, {}]",
            min, max
        )));
    }

    if config.max_concurrent < 1 || config.max_concurrent > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent must be between 1 and 100, got {}",
            config.max_concurrent
        )));
    }

    if let Some(proxy) = &config.proxy {
        Url::parse(proxy).map_err(|e| {
            ConfigError::Validation(format!("invalid proxy URL '{}': {}", proxy, e))
        })?;
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.name.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent name cannot be empty".to_string(),
        ));
    }

    if !config.name.chars().all(|c| c.is_alphanumeric() || c == '-') {
        return Err(ConfigError::Validation(format!(
            "user-agent name must contain only alphanumeric characters and hyphens, got '{}'",
            config.name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::Validation(format!("invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_limit_config(config: &LimitConfig) -> Result<(), ConfigError> {
    if config.initial_rps <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "initial-rps must be positive, got {}",
            config.initial_rps
        )));
    }

    match config.backend {
        LimitBackend::Adaptive => {
            if config.min_rps <= 0.0 || config.min_rps > config.max_rps {
                return Err(ConfigError::Validation(format!(
                    "adaptive limiter needs 0 < min-rps <= max-rps, got [{}, {}]",
                    config.min_rps, config.max_rps
                )));
            }
        }
        LimitBackend::TokenBucket => {
            if config.burst <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "burst must be positive, got {}",
                    config.burst
                )));
            }
        }
        LimitBackend::SlidingWindow => {
            if config.max_requests < 1 {
                return Err(ConfigError::Validation(
                    "max-requests must be >= 1".to_string(),
                ));
            }
            if config.window_secs <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "window-secs must be positive, got {}",
                    config.window_secs
                )));
            }
        }
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.base_delay_secs < 0.0 || config.max_delay_secs < config.base_delay_secs {
        return Err(ConfigError::Validation(format!(
            "retry delays must satisfy 0 <= base <= max, got [{}, {}]",
            config.base_delay_secs, config.max_delay_secs
        )));
    }

    if config.exponential_base < 1.0 {
        return Err(ConfigError::Validation(format!(
            "exponential-base must be >= 1, got {}",
            config.exponential_base
        )));
    }

    Ok(())
}

fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.backend == CacheBackend::None {
        return Ok(());
    }

    if config.maxsize < 1 {
        return Err(ConfigError::Validation(
            "cache maxsize must be >= 1".to_string(),
        ));
    }

    if config.backend == CacheBackend::Sqlite && config.path.is_empty() {
        return Err(ConfigError::Validation(
            "cache path cannot be empty for the sqlite backend".to_string(),
        ));
    }

    Ok(())
}

/// Basic email format validation: one '@', non-empty local part, and a
/// domain with at least one dot.
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "invalid contact-email: '{}'",
            email
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::Config;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_inverted_delay_range_rejected() {
        let mut config = Config::default();
        config.fetch.delay_range_secs = (5.0, 1.0);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_delay_range_accepted() {
        let mut config = Config::default();
        config.fetch.delay_range_secs = (0.0, 0.0);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_adaptive_bounds_rejected_when_inverted() {
        let mut config = Config::default();
        config.limit.min_rps = 20.0;
        config.limit.max_rps = 10.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_sliding_window_needs_budget() {
        let mut config = Config::default();
        config.limit.backend = LimitBackend::SlidingWindow;
        config.limit.max_requests = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_sqlite_cache_needs_path() {
        let mut config = Config::default();
        config.cache.backend = CacheBackend::Sqlite;
        config.cache.path = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_cache_none_skips_cache_checks() {
        let mut config = Config::default();
        config.cache.backend = CacheBackend::None;
        config.cache.maxsize = 0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_bad_email_rejected() {
        let mut config = Config::default();
        config.fetch.user_agent.contact_email = "not-an-email".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bad_proxy_rejected() {
        let mut config = Config::default();
        config.fetch.proxy = Some("not a url".to_string());
        assert!(validate(&config).is_err());
    }
}
