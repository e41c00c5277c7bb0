//! Delete-then-create reconciliation of the hostname's A record
//!
//! The provider exposes no update operation, so publishing a new address is
//! three steps executed in order:
//!
//! 1. **List** the zone and pick the records whose value is the previously
//!    published address.
//! 2. **Delete** those records one at a time. Any failure stops here, before
//!    anything is created.
//! 3. **Create** an A record for the new address.
//!
//! There is no rollback. Between steps the zone briefly holds zero records for
//! the hostname (after delete, before create), and a failed create leaves it
//! that way. Because matching is by value rather than by a remembered id,
//! running the same reconciliation again after a partial failure is safe: the
//! records that were already deleted simply do not match anymore.

use std::net::Ipv4Addr;

use tracing::{debug, info};

use crate::error::Result;
use crate::traits::{DnsProvider, DnsRecord, NewRecord};

/// What a successful reconciliation did to the zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Ids of records removed because they carried the previous address
    pub deleted: Vec<String>,
    /// The record that was created
    pub created: NewRecord,
}

/// Ids of the records whose value equals `previous_ip`
///
/// `None` (nothing published yet) matches no record.
pub fn stale_record_ids(records: &[DnsRecord], previous_ip: Option<Ipv4Addr>) -> Vec<String> {
    let Some(previous_ip) = previous_ip else {
        return Vec::new();
    };

    records
        .iter()
        .filter(|record| record.ipv4() == Some(previous_ip))
        .map(|record| record.id.clone())
        .collect()
}

/// Converge the zone so `hostname` publishes `new_ip`
///
/// # Parameters
///
/// - `provider`: Zone primitives
/// - `hostname`: Hostname of the created A record
/// - `previous_ip`: Address published before, if any; records with this value are deleted
/// - `new_ip`: Address to publish
///
/// # Returns
///
/// - `Ok(ReconcileReport)`: All deletes and the create succeeded
/// - `Err(Error)`: The first failing step; later steps were not attempted
pub async fn reconcile(
    provider: &dyn DnsProvider,
    hostname: &str,
    previous_ip: Option<Ipv4Addr>,
    new_ip: Ipv4Addr,
) -> Result<ReconcileReport> {
    let mut deleted = Vec::new();
    let created = reconcile_into(provider, hostname, previous_ip, new_ip, &mut deleted).await?;
    Ok(ReconcileReport { deleted, created })
}

/// Same as [`reconcile`], appending each deleted id to `deleted` as it goes
///
/// The ids of deletes that succeeded before a failure stay in `deleted`, so
/// a caller retrying the reconciliation can account for every record it
/// removed across attempts.
pub async fn reconcile_into(
    provider: &dyn DnsProvider,
    hostname: &str,
    previous_ip: Option<Ipv4Addr>,
    new_ip: Ipv4Addr,
    deleted: &mut Vec<String>,
) -> Result<NewRecord> {
    let records = provider.list_records().await?;
    debug!(
        "Listed {} record(s) from {}",
        records.len(),
        provider.provider_name()
    );

    let stale = stale_record_ids(&records, previous_ip);
    if stale.is_empty() {
        info!("No DNS records to delete");
    }

    for record_id in stale {
        provider.delete_record(&record_id).await?;
        info!("DNS record {} deleted", record_id);
        deleted.push(record_id);
    }

    let created = NewRecord::a(hostname, new_ip);
    provider.create_record(&created).await?;
    info!("DNS record created: {} -> {}", hostname, new_ip);

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, value: &str) -> DnsRecord {
        DnsRecord {
            id: id.to_string(),
            value: value.to_string(),
            hostname: None,
            record_type: None,
            ttl: None,
        }
    }

    #[test]
    fn test_stale_ids_match_previous_value_only() {
        let records = vec![
            record("a1", "1.2.3.4"),
            record("a2", "9.9.9.9"),
            record("a3", "1.2.3.4\n"),
        ];

        let ids = stale_record_ids(&records, Some(Ipv4Addr::new(1, 2, 3, 4)));
        assert_eq!(ids, vec!["a1".to_string(), "a3".to_string()]);
    }

    #[test]
    fn test_stale_ids_empty_without_previous() {
        let records = vec![record("a1", "1.2.3.4")];
        assert!(stale_record_ids(&records, None).is_empty());
    }

    #[test]
    fn test_stale_ids_skip_non_address_values() {
        let records = vec![record("t1", "v=spf1 -all"), record("c1", "example.com")];
        assert!(stale_record_ids(&records, Some(Ipv4Addr::new(1, 2, 3, 4))).is_empty());
    }
}
