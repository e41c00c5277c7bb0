// # DNS Provider Trait
//
// Defines the primitive zone operations a provider exposes.
//
// ## Implementations
//
// - Netlify: `ddns-provider-netlify` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::{DnsProvider, NewRecord};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     for record in provider.list_records().await? {
//         println!("{} -> {}", record.id, record.value);
//     }
//
//     provider
//         .create_record(&NewRecord::a("home.example.com", [1, 2, 3, 4].into()))
//         .await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// TTL used for every record this updater creates
pub const DEFAULT_TTL: u32 = 3600;

/// A record as reported by the provider
///
/// Only `id` and `value` are guaranteed; the remaining fields are kept when
/// the provider sends them and are used for startup seeding and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Opaque provider identifier
    pub id: String,
    /// Record value (an address for A records)
    pub value: String,
    /// Fully qualified hostname
    #[serde(default)]
    pub hostname: Option<String>,
    /// Record type ("A", "TXT", ...)
    #[serde(rename = "type", default)]
    pub record_type: Option<String>,
    /// Time-to-live in seconds
    #[serde(default)]
    pub ttl: Option<u32>,
}

impl DnsRecord {
    /// Parse the value as an IPv4 address, tolerating surrounding whitespace
    pub fn ipv4(&self) -> Option<Ipv4Addr> {
        self.value.trim().parse().ok()
    }

    /// Whether this is an A record published under `hostname`
    pub fn is_a_record_for(&self, hostname: &str) -> bool {
        let is_a = self
            .record_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("A"));
        let same_host = self
            .hostname
            .as_deref()
            .is_some_and(|h| same_hostname(h, hostname));
        is_a && same_host
    }
}

/// Body of a create request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRecord {
    #[serde(rename = "type")]
    pub record_type: &'static str,
    pub hostname: String,
    pub value: String,
    pub ttl: u32,
}

impl NewRecord {
    /// An A record for `hostname` pointing at `ip`, with the fixed TTL
    pub fn a(hostname: impl Into<String>, ip: Ipv4Addr) -> Self {
        Self {
            record_type: "A",
            hostname: hostname.into(),
            value: ip.to_string(),
            ttl: DEFAULT_TTL,
        }
    }
}

fn same_hostname(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}

/// Trait for DNS provider implementations
///
/// The provider offers no update or upsert: convergence is built from these
/// three primitives by [`crate::reconcile`].
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure (engine handles retry)
///
/// ## Forbidden Capabilities
/// - ❌ Implement retry logic or backoff (owned by `DdnsEngine`)
/// - ❌ Access state store (owned by `DdnsEngine`)
/// - ❌ Cache records between calls
/// - ❌ Decide which records to delete (owned by `reconcile`)
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Fetch every record currently in the zone
    async fn list_records(&self) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Delete one record by id
    ///
    /// Succeeds only when the provider confirms the deletion.
    async fn delete_record(&self, record_id: &str) -> Result<(), crate::Error>;

    /// Create a record
    ///
    /// Succeeds only when the provider confirms the creation.
    async fn create_record(&self, record: &NewRecord) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deserializes_with_only_id_and_value() {
        let record: DnsRecord =
            serde_json::from_str(r#"{"id":"a1","value":"1.2.3.4","extra":true}"#).unwrap();
        assert_eq!(record.id, "a1");
        assert_eq!(record.ipv4(), Some(Ipv4Addr::new(1, 2, 3, 4)));
        assert_eq!(record.hostname, None);
    }

    #[test]
    fn test_is_a_record_for_ignores_case_and_trailing_dot() {
        let record = DnsRecord {
            id: "a1".to_string(),
            value: "1.2.3.4".to_string(),
            hostname: Some("Home.Example.com.".to_string()),
            record_type: Some("A".to_string()),
            ttl: Some(3600),
        };
        assert!(record.is_a_record_for("home.example.com"));
        assert!(!record.is_a_record_for("www.example.com"));

        let txt = DnsRecord {
            record_type: Some("TXT".to_string()),
            ..record
        };
        assert!(!txt.is_a_record_for("home.example.com"));
    }

    #[test]
    fn test_new_record_body() {
        let body = serde_json::to_value(NewRecord::a("home.example.com", [5, 6, 7, 8].into()))
            .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "type": "A",
                "hostname": "home.example.com",
                "value": "5.6.7.8",
                "ttl": 3600,
            })
        );
    }
}
