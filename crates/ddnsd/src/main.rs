// # ddnsd - Netlify DDNS Daemon
//
// The ddnsd daemon is a thin integration layer. It is responsible for:
// 1. Reading configuration from environment variables (and an optional `.env`)
// 2. Initializing logging and the runtime
// 3. Building the IP source, the Netlify provider and the state store
// 4. Running the DDNS engine until SIGTERM/SIGINT or a fatal error
//
// All DDNS logic lives in ddns-core.
//
// ## Configuration
//
// ### Required
// - `ACCESS_TOKEN`: Netlify personal access token
// - `ZONE_ID`: Netlify DNS zone id
// - `HOSTNAME`: Hostname of the A record to manage. Variables already set in
//   the process environment win over `.env`, and container runtimes set
//   `HOSTNAME` to the container id, so set it explicitly there.
//
// ### Optional
// - `DDNS_IP_SOURCE_URL`: Echo service returning the public IP (default: https://ipinfo.io/ip)
// - `DDNS_CHECK_INTERVAL_SECS`: Seconds between checks (default: 43200)
// - `DDNS_API_BASE`: Netlify API base URL (default: https://api.netlify.com/api/v1)
// - `DDNS_STATE_STORE_TYPE`: file or memory (default: file)
// - `DDNS_STATE_STORE_PATH`: Path to state file (default: ddns-state.json)
// - `DDNS_SEED_FROM_ZONE`: Adopt the zone's A record when no state exists (default: true)
// - `DDNS_MAX_RETRIES`: Retry attempts per reconciliation (default: 3)
// - `DDNS_RETRY_DELAY_SECS`: Delay between retries (default: 5)
// - `DDNS_EXIT_ON_FAILURE`: Exit when retries are exhausted (default: false)
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
// - `DDNS_MODE`: live or dry-run (default: live). Dry-run logs zone changes
//   and never writes the state store.
//
// ## Example
//
// ```bash
// export ACCESS_TOKEN=nfp_xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx
// export ZONE_ID=5f1a2b3c4d5e6f7a8b9c0d1e
// export HOSTNAME=home.example.com
// export DDNS_STATE_STORE_PATH=/var/lib/ddns/state.json
//
// ddnsd
// ```

use anyhow::{Context, Result};
use ddns_core::config::{DEFAULT_API_BASE, DEFAULT_IP_SOURCE_URL};
use ddns_core::traits::StateStore;
use ddns_core::{
    DdnsConfig, DdnsEngine, EngineConfig, EngineEvent, FileStateStore, IpSourceConfig,
    MemoryStateStore, ProviderConfig, RecordConfig, StateStoreConfig,
};
use ddns_ip_http::HttpIpSource;
use ddns_provider_netlify::NetlifyProvider;
use std::env;
use std::path::Path;
use std::process::ExitCode;
use std::str::FromStr;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (fatal engine error)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

const DEFAULT_STATE_STORE_PATH: &str = "ddns-state.json";

/// Application configuration
struct Config {
    access_token: String,
    zone_id: String,
    hostname: String,
    ip_source_url: String,
    check_interval_secs: u64,
    api_base: String,
    state_store_type: String,
    state_store_path: String,
    seed_from_zone: bool,
    max_retries: usize,
    retry_delay_secs: u64,
    exit_on_failure: bool,
    log_level: String,
    dry_run: bool,
}

// Custom Debug implementation that hides the access token
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("access_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("hostname", &self.hostname)
            .field("ip_source_url", &self.ip_source_url)
            .field("check_interval_secs", &self.check_interval_secs)
            .field("api_base", &self.api_base)
            .field("state_store_type", &self.state_store_type)
            .field("state_store_path", &self.state_store_path)
            .field("seed_from_zone", &self.seed_from_zone)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_secs", &self.retry_delay_secs)
            .field("exit_on_failure", &self.exit_on_failure)
            .field("log_level", &self.log_level)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any key/value source
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| -> Result<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .with_context(|| format!("{} is required. Set it via: export {}=...", name, name))
        };
        let optional =
            |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let dry_run = match lookup("DDNS_MODE").unwrap_or_default().to_lowercase().as_str() {
            "" | "live" => false,
            "dry-run" => true,
            other => anyhow::bail!(
                "DDNS_MODE '{}' is not valid. Valid modes: live, dry-run",
                other
            ),
        };

        Ok(Self {
            access_token: required("ACCESS_TOKEN")?,
            zone_id: required("ZONE_ID")?,
            hostname: required("HOSTNAME")?,
            ip_source_url: optional("DDNS_IP_SOURCE_URL", DEFAULT_IP_SOURCE_URL),
            check_interval_secs: parse_var(&lookup, "DDNS_CHECK_INTERVAL_SECS", 43200)?,
            api_base: optional("DDNS_API_BASE", DEFAULT_API_BASE),
            state_store_type: optional("DDNS_STATE_STORE_TYPE", "file"),
            state_store_path: optional("DDNS_STATE_STORE_PATH", DEFAULT_STATE_STORE_PATH),
            seed_from_zone: parse_bool(&lookup, "DDNS_SEED_FROM_ZONE", true)?,
            max_retries: parse_var(&lookup, "DDNS_MAX_RETRIES", 3)?,
            retry_delay_secs: parse_var(&lookup, "DDNS_RETRY_DELAY_SECS", 5)?,
            exit_on_failure: parse_bool(&lookup, "DDNS_EXIT_ON_FAILURE", false)?,
            log_level: optional("DDNS_LOG_LEVEL", "info"),
            dry_run,
        })
    }

    /// Validate the configuration
    ///
    /// This performs validation including:
    /// - Value format validation (access token, hostname, URLs)
    /// - Numeric range validation
    /// - Type enumeration validation
    fn validate(&self) -> Result<()> {
        // Check for obvious placeholder tokens (common mistake)
        let token_lower = self.access_token.to_lowercase();
        if token_lower.contains("your_token")
            || token_lower.contains("replace_me")
            || token_lower == "token"
        {
            anyhow::bail!(
                "ACCESS_TOKEN appears to be a placeholder. \
                Use a personal access token from your Netlify user settings."
            );
        }

        if self.zone_id.contains('/') {
            anyhow::bail!("ZONE_ID must not contain '/'. Got: {}", self.zone_id);
        }

        self.validate_domain_name(&self.hostname)?;

        for (name, url) in [
            ("DDNS_IP_SOURCE_URL", &self.ip_source_url),
            ("DDNS_API_BASE", &self.api_base),
        ] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                anyhow::bail!("{} must use HTTP or HTTPS scheme. Got: {}", name, url);
            }
        }

        // Validate state store type
        match self.state_store_type.as_str() {
            "file" => {
                if self.state_store_path.is_empty() {
                    anyhow::bail!(
                        "DDNS_STATE_STORE_PATH cannot be empty when DDNS_STATE_STORE_TYPE=file"
                    );
                }
            }
            "memory" => {}
            _ => anyhow::bail!(
                "DDNS_STATE_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                self.state_store_type
            ),
        }

        // Validate numeric ranges
        if !(60..=604_800).contains(&self.check_interval_secs) {
            anyhow::bail!(
                "DDNS_CHECK_INTERVAL_SECS must be between 60 and 604800 seconds. Got: {}",
                self.check_interval_secs
            );
        }

        if self.max_retries > 10 {
            anyhow::bail!(
                "DDNS_MAX_RETRIES must be between 0 and 10. Got: {}",
                self.max_retries
            );
        }

        if !(1..=300).contains(&self.retry_delay_secs) {
            anyhow::bail!(
                "DDNS_RETRY_DELAY_SECS must be between 1 and 300 seconds. Got: {}",
                self.retry_delay_secs
            );
        }

        self.log_level()?;
        Ok(())
    }

    /// Validate that a string is a valid domain name
    ///
    /// This implements basic DNS domain name validation per RFC 1035.
    /// It's not comprehensive but catches common errors.
    fn validate_domain_name(&self, domain: &str) -> Result<()> {
        let domain = domain.strip_suffix('.').unwrap_or(domain);

        if domain.is_empty() {
            anyhow::bail!("HOSTNAME cannot be empty");
        }

        // Total length limit (RFC 1035: 253 chars max)
        if domain.len() > 253 {
            anyhow::bail!(
                "HOSTNAME too long: {} chars (max 253). Got: {}",
                domain.len(),
                domain
            );
        }

        for label in domain.split('.') {
            if label.is_empty() {
                anyhow::bail!("HOSTNAME has empty label: '{}'", domain);
            }

            if label.len() > 63 {
                anyhow::bail!(
                    "HOSTNAME label too long: {} chars (max 63). Label: '{}'",
                    label.len(),
                    label
                );
            }

            if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                anyhow::bail!(
                    "HOSTNAME label contains invalid characters. Label: '{}'. \
                    Valid: alphanumeric and hyphen only.",
                    label
                );
            }

            if label.starts_with('-') || label.ends_with('-') {
                anyhow::bail!(
                    "HOSTNAME label cannot start or end with hyphen. Label: '{}'",
                    label
                );
            }
        }

        Ok(())
    }

    fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    /// Build the engine configuration
    fn to_ddns_config(&self) -> DdnsConfig {
        let mut provider = ProviderConfig::new(self.access_token.clone(), self.zone_id.clone());
        provider.api_base = self.api_base.clone();
        provider.dry_run = self.dry_run;

        let state_store = match self.state_store_type.as_str() {
            "memory" => StateStoreConfig::Memory,
            _ => StateStoreConfig::File {
                path: self.state_store_path.clone(),
            },
        };

        DdnsConfig {
            ip_source: IpSourceConfig {
                url: self.ip_source_url.clone(),
                ..IpSourceConfig::default()
            },
            provider,
            state_store,
            record: RecordConfig::new(self.hostname.clone()),
            engine: EngineConfig {
                check_interval_secs: self.check_interval_secs,
                max_retries: self.max_retries,
                retry_delay_secs: self.retry_delay_secs,
                seed_from_zone: self.seed_from_zone,
                exit_on_failure: self.exit_on_failure,
                ..EngineConfig::default()
            },
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a non-negative integer. Got: {}", name, raw)),
    }
}

fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: bool) -> Result<bool> {
    match lookup(name).map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => anyhow::bail!("{} must be true or false. Got: {}", name, v),
        },
    }
}

/// Where the HOSTNAME value in use came from
#[derive(Debug, Clone, PartialEq, Eq)]
enum HostnameSource {
    /// Process environment, no `.env` entry
    Environment,
    /// `.env` file
    DotEnv,
    /// Process environment, shadowing a different `.env` entry
    EnvironmentOverDotEnv { dotenv_value: String },
}

impl std::fmt::Display for HostnameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Environment => write!(f, "the environment"),
            Self::DotEnv => write!(f, ".env"),
            Self::EnvironmentOverDotEnv { .. } => write!(f, "the environment (overriding .env)"),
        }
    }
}

/// `preset` is HOSTNAME before `.env` was loaded, `dotenv` the `.env` entry
fn hostname_source(preset: Option<&str>, dotenv: Option<&str>) -> HostnameSource {
    match (preset, dotenv) {
        (None, Some(_)) => HostnameSource::DotEnv,
        (Some(preset), Some(dotenv)) if preset != dotenv => {
            HostnameSource::EnvironmentOverDotEnv {
                dotenv_value: dotenv.to_string(),
            }
        }
        _ => HostnameSource::Environment,
    }
}

/// Warnings about a HOSTNAME that is probably not the intended record name
fn hostname_warnings(hostname: &str, source: &HostnameSource) -> Vec<String> {
    let mut warnings = Vec::new();

    if let HostnameSource::EnvironmentOverDotEnv { dotenv_value } = source {
        warnings.push(format!(
            "HOSTNAME={} from the process environment overrides HOSTNAME={} in .env",
            hostname, dotenv_value
        ));
    }

    if !hostname.trim_end_matches('.').contains('.') {
        warnings.push(format!(
            "HOSTNAME '{}' is a single label, not a name inside the DNS zone \
            (container runtimes set HOSTNAME to the container id)",
            hostname
        ));
    }

    warnings
}

/// Value of `key` in the `.env` file at `path`, if any
fn dotenv_value(path: &Path, key: &str) -> Option<String> {
    dotenvy::from_path_iter(path)
        .ok()?
        .filter_map(|item| item.ok())
        .find(|(name, _)| name == key)
        .map(|(_, value)| value)
}

fn main() -> ExitCode {
    let preset_hostname = env::var("HOSTNAME").ok();
    // A missing .env file is fine
    let dotenv_result = dotenvy::dotenv();

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = config.log_level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd daemon");
    let dotenv_hostname = match &dotenv_result {
        Ok(path) => {
            info!("Loaded environment from {}", path.display());
            dotenv_value(path, "HOSTNAME")
        }
        Err(_) => None,
    };

    let source = hostname_source(preset_hostname.as_deref(), dotenv_hostname.as_deref());
    info!("HOSTNAME {} taken from {}", config.hostname, source);
    for warning in hostname_warnings(&config.hostname, &source) {
        warn!("{}", warning);
    }
    debug!("Configuration: {:?}", config);

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let engine = match build_engine(&config).await {
            Ok(engine) => engine,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return DdnsExitCode::ConfigError;
            }
        };

        match run_daemon(engine).await {
            Ok(()) => DdnsExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DdnsExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Build the engine and its event receiver from configuration
async fn build_engine(config: &Config) -> Result<(DdnsEngine, mpsc::Receiver<EngineEvent>)> {
    let ddns_config = config.to_ddns_config();

    let ip_source =
        HttpIpSource::from_config(&ddns_config.ip_source).context("Invalid IP source")?;
    let provider =
        NetlifyProvider::new(&ddns_config.provider).context("Invalid Netlify provider")?;

    let state_store: Box<dyn StateStore> = match &ddns_config.state_store {
        StateStoreConfig::File { path } => Box::new(
            FileStateStore::new(path)
                .await
                .with_context(|| format!("Failed to open state file {}", path))?,
        ),
        StateStoreConfig::Memory => {
            warn!("Using in-memory state store; the published IP is forgotten on restart");
            Box::new(MemoryStateStore::new())
        }
    };

    info!(
        "Managing A record {} in zone {} (IP source: {})",
        ddns_config.record.hostname,
        ddns_config.provider.zone_id,
        ip_source.url()
    );

    let engine = DdnsEngine::new(
        Box::new(ip_source),
        Box::new(provider),
        state_store,
        ddns_config,
    )?;
    Ok(engine)
}

/// Run the engine until a shutdown signal or a fatal error
async fn run_daemon(
    (engine, mut events): (DdnsEngine, mpsc::Receiver<EngineEvent>),
) -> Result<()> {
    let event_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let signal_task = tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => error!("Signal handling failed, shutting down: {:#}", e),
        }
        let _ = shutdown_tx.send(());
    });

    let result = engine.run_with_shutdown(Some(shutdown_rx)).await;

    signal_task.abort();
    // Closing the channel ends the event task once queued events are logged
    drop(engine);
    let _ = event_task.await;

    result.context("Engine stopped with a fatal error")
}

fn log_event(event: &EngineEvent) {
    match event {
        EngineEvent::ReconcileFailed { error, retry_count } => {
            warn!("Reconcile failed after {} retries: {}", retry_count, error)
        }
        EngineEvent::Stopped { reason } => info!("Engine stopped: {}", reason),
        other => debug!("Engine event: {:?}", other),
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
