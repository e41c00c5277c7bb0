// # Netlify DNS Provider
//
// This crate provides the Netlify DNS provider implementation for the DDNS system.
//
// ## Scope
//
// The provider exposes the three zone primitives the engine reconciles with.
// It makes exactly one HTTP request per call and never retries; retries and
// scheduling are owned by `DdnsEngine`.
//
// ## Security Requirements
//
// - The access token NEVER appears in logs or Debug output
// - The access token is supplied by configuration only
// - Construction fails fast if the token is empty
//
// ## API Reference
//
// - List records:  GET    `/dns_zones/:zone_id/dns_records`             → 200
// - Delete record: DELETE `/dns_zones/:zone_id/dns_records/:record_id`  → 204
// - Create record: POST   `/dns_zones/:zone_id/dns_records`             → 201
//
// All requests carry `Authorization: Bearer <token>` and
// `Content-Type: application/json`.

use async_trait::async_trait;
use ddns_core::config::ProviderConfig;
use ddns_core::traits::{DnsProvider, DnsRecord, NewRecord};
use ddns_core::{Error, Result};
use reqwest::StatusCode;
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Netlify DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform list requests as usual
/// - Log the intended DELETE and POST requests
/// - **NOT** modify the zone
pub struct NetlifyProvider {
    /// Personal access token
    /// ⚠️ NEVER log this value
    access_token: String,

    /// DNS zone identifier
    zone_id: String,

    /// API base URL, without trailing slash
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: list for real, log mutations only
    dry_run: bool,
}

// Custom Debug implementation that hides the access token
impl std::fmt::Debug for NetlifyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetlifyProvider")
            .field("access_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl NetlifyProvider {
    /// Create a Netlify provider from configuration
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the configuration is invalid or the HTTP client
    ///   cannot be built
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        if config.dry_run {
            tracing::warn!("Netlify provider running in DRY-RUN mode - no changes will be made");
        }

        Ok(Self {
            access_token: config.access_token.clone(),
            zone_id: config.zone_id.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client,
            dry_run: config.dry_run,
        })
    }

    /// Whether mutations are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn records_url(&self) -> String {
        format!("{}/dns_zones/{}/dns_records", self.api_base, self.zone_id)
    }

    fn record_url(&self, record_id: &str) -> String {
        format!("{}/{}", self.records_url(), record_id)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.access_token)
            .header("Content-Type", "application/json")
    }

    async fn send(
        &self,
        operation: &'static str,
        builder: reqwest::RequestBuilder,
        expected: StatusCode,
    ) -> Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| Error::http(format!("{} request failed: {}", operation, e)))?;

        if response.status() == expected {
            Ok(response)
        } else {
            Err(status_error(operation, response).await)
        }
    }
}

/// Map a response with an unexpected status to an error
async fn status_error(operation: &'static str, response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid access token or insufficient permissions ({} returned {})",
            operation, status
        )),
        404 => Error::not_found(format!("{} returned {}: {}", operation, status, body)),
        429 => Error::rate_limited(format!("{} returned {}", operation, status)),
        code => Error::unexpected_status(operation, code, body),
    }
}

#[async_trait]
impl DnsProvider for NetlifyProvider {
    /// List every record in the zone
    ///
    /// ```http
    /// GET /dns_zones/:zone_id/dns_records
    /// Authorization: Bearer <token>
    /// ```
    async fn list_records(&self) -> Result<Vec<DnsRecord>> {
        let url = self.records_url();
        let response = self
            .send(
                "list",
                self.request(reqwest::Method::GET, &url),
                StatusCode::OK,
            )
            .await?;

        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read list response: {}", e)))?;
        let records: Vec<DnsRecord> = serde_json::from_str(&body)?;

        tracing::debug!("Zone {} holds {} record(s)", self.zone_id, records.len());
        Ok(records)
    }

    /// Delete one record by id
    ///
    /// ```http
    /// DELETE /dns_zones/:zone_id/dns_records/:record_id
    /// ```
    async fn delete_record(&self, record_id: &str) -> Result<()> {
        if record_id.is_empty() || record_id.contains('/') {
            return Err(Error::invalid_input(format!(
                "Invalid record id: {:?}",
                record_id
            )));
        }

        let url = self.record_url(record_id);
        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send DELETE request to {}", url);
            return Ok(());
        }

        self.send(
            "delete",
            self.request(reqwest::Method::DELETE, &url),
            StatusCode::NO_CONTENT,
        )
        .await?;

        tracing::debug!("DELETE {} returned 204", url);
        Ok(())
    }

    /// Create an A record
    ///
    /// ```http
    /// POST /dns_zones/:zone_id/dns_records
    /// {
    ///   "type": "A",
    ///   "hostname": "home.example.com",
    ///   "value": "1.2.3.4",
    ///   "ttl": 3600
    /// }
    /// ```
    ///
    /// The response body is not inspected; a 201 is success.
    async fn create_record(&self, record: &NewRecord) -> Result<()> {
        let url = self.records_url();
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                url,
                serde_json::to_string(record)?
            );
            return Ok(());
        }

        self.send(
            "create",
            self.request(reqwest::Method::POST, &url).json(record),
            StatusCode::CREATED,
        )
        .await?;

        tracing::debug!(
            "POST {} returned 201 for {} (ttl {})",
            url,
            record.hostname,
            record.ttl
        );
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "netlify"
    }
}
