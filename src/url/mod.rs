//! URL handling for Driftnet
//!
//! This module provides URL validation, normalization for cache keys,
//! domain extraction, and network-location comparison for domain-scoped
//! crawling.

use crate::{UrlError, UrlResult};
use url::Url;

/// Schemes the fetcher is willing to touch
const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

/// Validates a URL string and parses it into a [`Url`]
///
/// A URL is accepted when it parses as an absolute URL, uses an http(s)
/// scheme, and has a host. Anything else is a `ValidationError` and is
/// never retried.
///
/// # Examples
///
/// ```
/// use driftnet::url::validate_url;
///
/// assert!(validate_url("https://example.com/page").is_ok());
/// assert!(validate_url("ftp://example.com/file").is_err());
/// assert!(validate_url("not a url").is_err());
/// ```
pub fn validate_url(raw: &str) -> UrlResult<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    let url = Url::parse(trimmed).map_err(|e| UrlError::Parse(format!("{}: {}", trimmed, e)))?;

    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return Err(UrlError::DisallowedScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

/// Normalizes a URL for cache-key derivation
///
/// The same page reached through trivially different spellings must map to
/// the same cache fingerprint, so this lowercases the host and strips the
/// fragment. Query strings are kept; they usually select different content.
pub fn normalize_for_key(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    // Url already lowercases registered hosts during parsing, so the
    // serialized form is stable at this point.
    normalized.to_string()
}

/// Extracts the lowercase domain (host) from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use driftnet::url::extract_domain;
///
/// let url = Url::parse("https://Sub.Example.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("sub.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Compares the network location (host and effective port) of two URLs
///
/// This is the `same_domain` boundary check for crawling: an exact
/// netloc match, so `a.example` and `sub.a.example` are different
/// locations, as are the same host on different ports.
pub fn same_netloc(a: &Url, b: &Url) -> bool {
    extract_domain(a) == extract_domain(b) && a.port_or_known_default() == b.port_or_known_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_http_and_https() {
        assert!(validate_url("http://example.com/").is_ok());
        assert!(validate_url("https://example.com/").is_ok());
    }

    #[test]
    fn test_validate_rejects_other_schemes() {
        assert!(matches!(
            validate_url("ftp://example.com/"),
            Err(UrlError::DisallowedScheme(_))
        ));
        assert!(matches!(
            validate_url("javascript:void(0)"),
            Err(UrlError::DisallowedScheme(_)) | Err(UrlError::Parse(_)) | Err(UrlError::MissingDomain)
        ));
    }

    #[test]
    fn test_validate_rejects_malformed() {
        assert!(validate_url("").is_err());
        assert!(validate_url("   ").is_err());
        assert!(validate_url("not a url").is_err());
        assert!(validate_url("/relative/path").is_err());
    }

    #[test]
    fn test_validate_trims_whitespace() {
        let url = validate_url("  https://example.com/page  ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_normalize_strips_fragment() {
        let url = Url::parse("https://example.com/page#section").unwrap();
        assert_eq!(normalize_for_key(&url), "https://example.com/page");
    }

    #[test]
    fn test_normalize_keeps_query() {
        let url = Url::parse("https://example.com/search?q=rust").unwrap();
        assert_eq!(normalize_for_key(&url), "https://example.com/search?q=rust");
    }

    #[test]
    fn test_normalize_lowercases_host() {
        let url = Url::parse("https://EXAMPLE.com/Page").unwrap();
        assert_eq!(normalize_for_key(&url), "https://example.com/Page");
    }

    #[test]
    fn test_extract_domain_lowercase() {
        let url = Url::parse("https://Blog.Example.COM/post").unwrap();
        assert_eq!(extract_domain(&url), Some("blog.example.com".to_string()));
    }

    #[test]
    fn test_same_netloc_exact_match() {
        let a = Url::parse("https://a.example/").unwrap();
        let b = Url::parse("https://a.example/other/page").unwrap();
        assert!(same_netloc(&a, &b));
    }

    #[test]
    fn test_same_netloc_rejects_other_host() {
        let a = Url::parse("https://a.example/").unwrap();
        let b = Url::parse("https://other.example/x").unwrap();
        assert!(!same_netloc(&a, &b));
    }

    #[test]
    fn test_same_netloc_rejects_subdomain() {
        let a = Url::parse("https://a.example/").unwrap();
        let b = Url::parse("https://sub.a.example/").unwrap();
        assert!(!same_netloc(&a, &b));
    }

    #[test]
    fn test_same_netloc_respects_port() {
        let a = Url::parse("http://127.0.0.1:8080/").unwrap();
        let b = Url::parse("http://127.0.0.1:9090/").unwrap();
        assert!(!same_netloc(&a, &b));

        let c = Url::parse("https://example.com/").unwrap();
        let d = Url::parse("https://example.com:443/").unwrap();
        assert!(same_netloc(&c, &d));
    }
}
