// # State Store Trait
//
// Defines the interface for remembering the last published address.
//
// ## Purpose
//
// The engine keeps `last_known_ip` in memory while it runs. The state store
// carries that value across restarts so a restarted updater does not treat
// an unchanged address as new, and so it still knows which stale value to
// delete after its address changed while it was down.
//
// ## Implementations
//
// - `MemoryStateStore`: lost on restart
// - `FileStateStore`: JSON file with atomic writes and a backup copy

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// State record for a hostname
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StateRecord {
    /// The last address published for the hostname
    pub last_ip: Ipv4Addr,
    /// Timestamp of the last successful reconciliation
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

impl StateRecord {
    /// Create a new state record stamped with the current time
    pub(crate) fn new(last_ip: Ipv4Addr) -> Self {
        Self {
            last_ip,
            last_updated: chrono::Utc::now(),
        }
    }
}

/// Trait for state store implementations
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Forbidden Capabilities
/// - ❌ Spawn background tasks
/// - ❌ Perform DNS updates (owned by `DnsProvider`)
/// - ❌ Decide when to update (owned by `DdnsEngine`)
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the last published IP for a hostname
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Ipv4Addr))`: The last published IP
    /// - `Ok(None)`: Nothing recorded
    /// - `Err(Error)`: Storage error
    async fn get_last_ip(&self, hostname: &str) -> Result<Option<Ipv4Addr>, crate::Error>;

    /// Get the full state record
    async fn get_record(&self, hostname: &str) -> Result<Option<StateRecord>, crate::Error>;

    /// Record `ip` as published for `hostname`
    ///
    /// Called only after a successful reconciliation.
    async fn set_last_ip(&self, hostname: &str, ip: Ipv4Addr) -> Result<(), crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}
