// # HTTP IP Source
//
// This crate provides the HTTP echo-service IP source for the DDNS system.
//
// ## Behavior
//
// One GET per observation against a service whose response body is the
// caller's public address (e.g. https://ipinfo.io/ip). The body is trimmed
// and must parse as an IPv4 address; anything else is an observation
// failure and the engine skips the cycle.
//
// Nothing is cached: every call to `current()` asks the service again.

use ddns_core::config::IpSourceConfig;
use ddns_core::traits::IpSource;
use ddns_core::{Error, Result};

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Default request timeout for the echo service
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// HTTP echo-service IP source
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// URL to fetch the address from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source with the default timeout
    ///
    /// # Parameters
    ///
    /// - `url`: URL whose body is the caller's address (e.g. "https://ipinfo.io/ip")
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create with a custom request timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Create from validated configuration
    pub fn from_config(config: &IpSourceConfig) -> Result<Self> {
        config.validate()?;
        Self::with_timeout(config.url.clone(), Duration::from_secs(config.timeout_secs))
    }

    /// URL this source queries
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Parse an echo-service body into an IPv4 address
///
/// Surrounding whitespace (typically a trailing newline) is ignored.
fn parse_body(body: &str) -> Result<Ipv4Addr> {
    let text = body.trim();
    if text.is_empty() {
        return Err(Error::ip_source("Echo service returned an empty body"));
    }

    match text.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => Ok(ip),
        Ok(IpAddr::V6(ip)) => Err(Error::ip_source(format!("Expected IPv4, got: {}", ip))),
        Err(_) => Err(Error::ip_source(format!("Invalid IP address: {}", text))),
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<Ipv4Addr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::ip_source(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ip_source(format!(
                "{} answered with HTTP {}",
                self.url, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::ip_source(format!("Failed to read response: {}", e)))?;

        let ip = parse_body(&body)?;
        tracing::debug!("{} reported {}", self.url, ip);
        Ok(ip)
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}
