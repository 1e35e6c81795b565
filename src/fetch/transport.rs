//! Network transport
//!
//! The fetch pipeline talks to the network through the [`Transport`] trait:
//! hand it a request, get back status + headers + body, or a transport
//! error. The default implementation wraps a reqwest client; a rendered-
//! browser surrogate can slot in behind the same trait.

use crate::config::FetchConfig;
use crate::{DriftError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// A single outbound request, immutable once issued
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    pub method: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn get(url: Url, timeout: Duration) -> Self {
        Self {
            url,
            method: "GET".to_string(),
            headers: HashMap::new(),
            body: None,
            timeout,
        }
    }

    pub fn post(url: Url, body: Vec<u8>, timeout: Duration) -> Self {
        Self {
            url,
            method: "POST".to_string(),
            headers: HashMap::new(),
            body: Some(body),
            timeout,
        }
    }
}

/// What came back over the wire, before any policy is applied
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// Network collaborator: send a request, get a response or a transport error
///
/// Implementations must not interpret HTTP status codes; a 404 or 500 is a
/// successful transport round trip. Only connection-level failures
/// (timeout, refused connection, TLS) surface as errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &FetchRequest) -> Result<RawResponse>;
}

/// Builds the HTTP client used by [`HttpTransport`]
///
/// The user agent identifies the crawler and a contact point, formatted
/// `name/version (+contact-url; contact-email)`. Compression and a connect
/// timeout match what a polite crawler should carry.
pub fn build_http_client(config: &FetchConfig) -> Result<Client> {
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.user_agent.name,
        config.user_agent.version,
        config.user_agent.contact_url,
        config.user_agent.contact_email
    );

    use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};

    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert("DNT", HeaderValue::from_static("1"));

    let mut builder = Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(
            reqwest::Proxy::all(proxy).map_err(|e| DriftError::Transport {
                url: proxy.clone(),
                message: format!("invalid proxy: {}", e),
            })?,
        );
    }

    builder.build().map_err(|e| DriftError::Transport {
        url: String::new(),
        message: format!("failed to build HTTP client: {}", e),
    })
}

/// reqwest-backed [`Transport`]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn classify_error(url: &Url, error: reqwest::Error) -> DriftError {
        if error.is_timeout() {
            DriftError::Timeout {
                url: url.to_string(),
            }
        } else if error.is_connect() {
            DriftError::Transport {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }
        } else {
            DriftError::Transport {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &FetchRequest) -> Result<RawResponse> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes()).map_err(|_| {
            DriftError::Transport {
                url: request.url.to_string(),
                message: format!("invalid method: {}", request.method),
            }
        })?;

        let mut builder = self
            .client
            .request(method, request.url.clone())
            .timeout(request.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::classify_error(&request.url, e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::classify_error(&request.url, e))?
            .to_vec();

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;

    #[test]
    fn test_build_http_client() {
        let config = FetchConfig::default();
        assert!(build_http_client(&config).is_ok());
    }

    #[test]
    fn test_build_client_rejects_bad_proxy() {
        let config = FetchConfig {
            proxy: Some("::not a proxy::".to_string()),
            ..FetchConfig::default()
        };
        assert!(build_http_client(&config).is_err());
    }

    #[test]
    fn test_fetch_request_get() {
        let url = Url::parse("https://example.com/").unwrap();
        let request = FetchRequest::get(url, Duration::from_secs(30));
        assert_eq!(request.method, "GET");
        assert!(request.headers.is_empty());
        assert!(request.body.is_none());
    }

    #[test]
    fn test_fetch_request_post_carries_body() {
        let url = Url::parse("https://example.com/submit").unwrap();
        let request = FetchRequest::post(url, b"payload".to_vec(), Duration::from_secs(30));
        assert_eq!(request.method, "POST");
        assert_eq!(request.body.as_deref(), Some(&b"payload"[..]));
    }
}
