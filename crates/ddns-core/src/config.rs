//! Configuration types for the DDNS system
//!
//! This module defines all configuration structures used throughout the crate.
//! Values are immutable once the engine is built.

use serde::{Deserialize, Serialize};

/// Default IP echo service
pub const DEFAULT_IP_SOURCE_URL: &str = "https://ipinfo.io/ip";

/// Default Netlify API base URL
pub const DEFAULT_API_BASE: &str = "https://api.netlify.com/api/v1";

/// Main DDNS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// IP source configuration
    #[serde(default)]
    pub ip_source: IpSourceConfig,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// State store configuration
    #[serde(default)]
    pub state_store: StateStoreConfig,

    /// The record to manage
    pub record: RecordConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DdnsConfig {
    /// Create a configuration with default ambient settings
    pub fn new(provider: ProviderConfig, record: RecordConfig) -> Self {
        Self {
            ip_source: IpSourceConfig::default(),
            provider,
            state_store: StateStoreConfig::default(),
            record,
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.provider.validate()?;
        self.ip_source.validate()?;
        self.record.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// IP source configuration (HTTP echo service)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpSourceConfig {
    /// URL whose response body is the caller's address
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_ip_timeout_secs")]
    pub timeout_secs: u64,
}

impl IpSourceConfig {
    /// Validate the IP source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.url.is_empty() {
            return Err(crate::Error::config("IP source URL cannot be empty"));
        }
        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "IP source URL must use HTTP or HTTPS scheme. Got: {}",
                self.url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("IP source timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for IpSourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_IP_SOURCE_URL.to_string(),
            timeout_secs: default_ip_timeout_secs(),
        }
    }
}

/// Netlify provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Bearer token
    /// ⚠️ NEVER log this value
    pub access_token: String,

    /// DNS zone identifier
    pub zone_id: String,

    /// API base URL, without trailing slash
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Perform lists but only log deletes and creates
    #[serde(default)]
    pub dry_run: bool,
}

// Custom Debug implementation that hides the access token
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("access_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl ProviderConfig {
    /// Create a live provider configuration against the public API
    pub fn new(access_token: impl Into<String>, zone_id: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            zone_id: zone_id.into(),
            api_base: default_api_base(),
            dry_run: false,
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.access_token.is_empty() {
            return Err(crate::Error::config("Access token cannot be empty"));
        }
        if self.zone_id.is_empty() {
            return Err(crate::Error::config("Zone ID cannot be empty"));
        }
        if self.zone_id.contains('/') {
            return Err(crate::Error::config(format!(
                "Zone ID must not contain '/': {}",
                self.zone_id
            )));
        }
        if self.api_base.is_empty() {
            return Err(crate::Error::config("API base URL cannot be empty"));
        }
        Ok(())
    }
}

/// State store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStoreConfig {
    /// File-based state store
    File {
        /// Path to the state file
        path: String,
    },

    /// In-memory state store (not persistent)
    #[default]
    Memory,
}

/// The single record this updater manages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Hostname of the A record (e.g., "home.example.com")
    pub hostname: String,
}

impl RecordConfig {
    /// Create a new record configuration
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
        }
    }

    /// Validate the record configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.hostname.trim().is_empty() {
            return Err(crate::Error::config("Hostname cannot be empty"));
        }
        Ok(())
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between observations
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,

    /// Maximum number of retry attempts for a failed reconciliation
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Delay between retry attempts (in seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Derive the initial address from the zone when the state store is empty
    #[serde(default = "default_seed_from_zone")]
    pub seed_from_zone: bool,

    /// End the engine when retries are exhausted instead of waiting for the
    /// next cycle
    #[serde(default)]
    pub exit_on_failure: bool,

    /// Capacity of the internal event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.check_interval_secs == 0 {
            return Err(crate::Error::config("Check interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            seed_from_zone: default_seed_from_zone(),
            exit_on_failure: false,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_ip_timeout_secs() -> u64 {
    10
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_check_interval_secs() -> u64 {
    12 * 60 * 60
}

fn default_max_retries() -> usize {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_seed_from_zone() -> bool {
    true
}

fn default_event_channel_capacity() -> usize {
    1000
}
