// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Crash Behavior
//
// - All state is lost on restart/crash
// - The first cycle after a restart starts from whatever the engine derives
//   from the zone (or from nothing), exactly as the bare in-memory
//   `last_known_ip` would

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::{StateRecord, StateStore};

/// In-memory state store implementation
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<HashMap<String, StateRecord>>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_last_ip(&self, hostname: &str) -> Result<Option<Ipv4Addr>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(hostname).map(|record| record.last_ip))
    }

    async fn get_record(&self, hostname: &str) -> Result<Option<StateRecord>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(hostname).cloned())
    }

    async fn set_last_ip(&self, hostname: &str, ip: Ipv4Addr) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(hostname.to_string(), StateRecord::new(ip));
        Ok(())
    }

    async fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}
