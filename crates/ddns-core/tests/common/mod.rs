//! Test doubles and common utilities for contract tests
//!
//! - `ScriptedIpSource` replays a fixed list of observations
//! - `ZoneProvider` keeps an in-memory zone and records every call
//! - `CountingStateStore` wraps a memory store and counts writes/flushes,
//!   optionally failing every write

#![allow(dead_code)]

use ddns_core::error::{Error, Result};
use ddns_core::traits::{DnsProvider, DnsRecord, IpSource, NewRecord, StateRecord, StateStore};
use ddns_core::{DdnsConfig, EngineConfig, MemoryStateStore, ProviderConfig, RecordConfig};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

pub const HOSTNAME: &str = "home.example.com";

pub fn ip(s: &str) -> Ipv4Addr {
    s.parse().expect("valid test address")
}

/// An IP source that returns scripted observations in order
///
/// `None` entries fail the lookup. When the last entry is handed out the
/// paired shutdown receiver fires, so `run_with_shutdown` stops right after
/// the final cycle.
#[derive(Clone)]
pub struct ScriptedIpSource {
    script: Arc<Mutex<VecDeque<Option<Ipv4Addr>>>>,
    shutdown_tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedIpSource {
    pub fn new(script: Vec<Option<Ipv4Addr>>) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let source = Self {
            script: Arc::new(Mutex::new(script.into())),
            shutdown_tx: Arc::new(Mutex::new(Some(tx))),
            calls: Arc::new(AtomicUsize::new(0)),
        };
        (source, rx)
    }

    /// Number of times current() was called
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for ScriptedIpSource {
    async fn current(&self) -> Result<Ipv4Addr> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let (next, exhausted) = {
            let mut script = self.script.lock().unwrap();
            let next = script.pop_front();
            (next, script.is_empty())
        };

        if exhausted && let Some(tx) = self.shutdown_tx.lock().unwrap().take() {
            let _ = tx.send(());
        }

        match next {
            Some(Some(ip)) => Ok(ip),
            Some(None) => Err(Error::ip_source("echo service unavailable")),
            None => Err(Error::ip_source("script exhausted")),
        }
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// One call made against the zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Delete(String),
    Create { hostname: String, value: String },
}

#[derive(Default)]
struct Zone {
    records: Vec<DnsRecord>,
    next_id: usize,
    calls: Vec<Call>,
    list_failures: Vec<u16>,
    delete_failures: Vec<u16>,
    failing_delete_ids: Vec<String>,
    create_failures: Vec<u16>,
}

fn status_error(operation: &'static str, status: u16) -> Error {
    match status {
        401 | 403 => Error::auth(format!("{} rejected with {}", operation, status)),
        429 => Error::rate_limited(format!("{} rate limited", operation)),
        _ => Error::unexpected_status(operation, status, ""),
    }
}

/// An in-memory zone that behaves like the provider API
///
/// Clones share the same zone, so a test can keep one handle and give
/// another to the engine.
#[derive(Clone, Default)]
pub struct ZoneProvider {
    zone: Arc<Mutex<Zone>>,
}

impl ZoneProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zone pre-populated with records that only carry id and value
    pub fn with_values(records: &[(&str, &str)]) -> Self {
        let provider = Self::new();
        {
            let mut zone = provider.zone.lock().unwrap();
            zone.records = records
                .iter()
                .map(|(id, value)| DnsRecord {
                    id: id.to_string(),
                    value: value.to_string(),
                    hostname: None,
                    record_type: None,
                    ttl: None,
                })
                .collect();
        }
        provider
    }

    /// Add a full A record
    pub fn add_a_record(&self, id: &str, hostname: &str, value: &str) {
        self.zone.lock().unwrap().records.push(DnsRecord {
            id: id.to_string(),
            value: value.to_string(),
            hostname: Some(hostname.to_string()),
            record_type: Some("A".to_string()),
            ttl: Some(3600),
        });
    }

    /// Fail the next list calls with these statuses, in order
    pub fn fail_lists(&self, statuses: &[u16]) {
        self.zone.lock().unwrap().list_failures = statuses.to_vec();
    }

    /// Fail the next delete calls with these statuses, in order
    pub fn fail_deletes(&self, statuses: &[u16]) {
        self.zone.lock().unwrap().delete_failures = statuses.to_vec();
    }

    /// Fail the next delete of this record id with a 500
    pub fn fail_delete_of(&self, record_id: &str) {
        self.zone
            .lock()
            .unwrap()
            .failing_delete_ids
            .push(record_id.to_string());
    }

    /// Fail the next create calls with these statuses, in order
    pub fn fail_creates(&self, statuses: &[u16]) {
        self.zone.lock().unwrap().create_failures = statuses.to_vec();
    }

    pub fn records(&self) -> Vec<DnsRecord> {
        self.zone.lock().unwrap().records.clone()
    }

    pub fn values(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.value).collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.id).collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.zone.lock().unwrap().calls.clone()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn created_values(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Create { value, .. } => Some(value),
                _ => None,
            })
            .collect()
    }

    pub fn list_count(&self) -> usize {
        self.calls().iter().filter(|c| **c == Call::List).count()
    }
}

#[async_trait::async_trait]
impl DnsProvider for ZoneProvider {
    async fn list_records(&self) -> Result<Vec<DnsRecord>> {
        let mut zone = self.zone.lock().unwrap();
        zone.calls.push(Call::List);
        if !zone.list_failures.is_empty() {
            let status = zone.list_failures.remove(0);
            return Err(status_error("list", status));
        }
        Ok(zone.records.clone())
    }

    async fn delete_record(&self, record_id: &str) -> Result<()> {
        let mut zone = self.zone.lock().unwrap();
        zone.calls.push(Call::Delete(record_id.to_string()));
        if !zone.delete_failures.is_empty() {
            let status = zone.delete_failures.remove(0);
            return Err(status_error("delete", status));
        }
        if let Some(pos) = zone.failing_delete_ids.iter().position(|id| id == record_id) {
            zone.failing_delete_ids.remove(pos);
            return Err(status_error("delete", 500));
        }

        let before = zone.records.len();
        zone.records.retain(|r| r.id != record_id);
        if zone.records.len() == before {
            return Err(Error::not_found(format!("record {}", record_id)));
        }
        Ok(())
    }

    async fn create_record(&self, record: &NewRecord) -> Result<()> {
        let mut zone = self.zone.lock().unwrap();
        zone.calls.push(Call::Create {
            hostname: record.hostname.clone(),
            value: record.value.clone(),
        });
        if !zone.create_failures.is_empty() {
            let status = zone.create_failures.remove(0);
            return Err(status_error("create", status));
        }

        zone.next_id += 1;
        let id = format!("new-{}", zone.next_id);
        zone.records.push(DnsRecord {
            id,
            value: record.value.clone(),
            hostname: Some(record.hostname.clone()),
            record_type: Some(record.record_type.to_string()),
            ttl: Some(record.ttl),
        });
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "zone"
    }
}

/// A memory state store that counts writes and flushes
#[derive(Clone, Default)]
pub struct CountingStateStore {
    inner: MemoryStateStore,
    set_calls: Arc<AtomicUsize>,
    flush_calls: Arc<AtomicUsize>,
    fail_writes: bool,
}

impl CountingStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose every `set_last_ip` fails, as with a full disk
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn set_call_count(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn flush_call_count(&self) -> usize {
        self.flush_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StateStore for CountingStateStore {
    async fn get_last_ip(&self, hostname: &str) -> Result<Option<Ipv4Addr>> {
        self.inner.get_last_ip(hostname).await
    }

    async fn get_record(&self, hostname: &str) -> Result<Option<StateRecord>> {
        self.inner.get_record(hostname).await
    }

    async fn set_last_ip(&self, hostname: &str, ip: Ipv4Addr) -> Result<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(Error::state_store("No space left on device"));
        }
        self.inner.set_last_ip(hostname, ip).await
    }

    async fn flush(&self) -> Result<()> {
        self.flush_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.flush().await
    }
}

/// Configuration with retries and zone seeding disabled
pub fn minimal_config() -> DdnsConfig {
    DdnsConfig {
        engine: EngineConfig {
            max_retries: 0,
            retry_delay_secs: 1,
            seed_from_zone: false,
            event_channel_capacity: 100,
            ..EngineConfig::default()
        },
        ..DdnsConfig::new(
            ProviderConfig::new("test-token", "zone-1"),
            RecordConfig::new(HOSTNAME),
        )
    }
}

/// Configuration with the given retry policy
pub fn retrying_config(max_retries: usize, exit_on_failure: bool) -> DdnsConfig {
    let mut config = minimal_config();
    config.engine.max_retries = max_retries;
    config.engine.exit_on_failure = exit_on_failure;
    config
}
