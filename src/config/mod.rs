//! Configuration module for Driftnet
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Every value has a default, so `Config::default()` is a working
//! configuration and a config file only overrides what it names.
//!
//! # Example
//!
//! ```no_run
//! use driftnet::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("driftnet.toml")).unwrap();
//! println!("Fetch timeout: {}s", config.fetch.timeout_secs);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CacheBackend, CacheConfig, Config, CrawlConfig, FetchConfig, LimitBackend, LimitConfig,
    RetryConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::load_config;

// Re-export validation for callers that build configs programmatically
pub use validation::validate;
