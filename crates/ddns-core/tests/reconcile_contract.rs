//! Contract Test: Delete-then-Create Reconciliation
//!
//! Constraints verified:
//! - Every record whose value equals the previous address is deleted
//! - Exactly one A record for the new address is created afterwards
//! - A failed delete prevents the create
//! - A failed create leaves the deletes in place (no rollback)
//! - Deletes that succeeded before a failure are still accounted for
//!
//! If this test fails, the zone can end up with stale or duplicate records.

mod common;

use common::*;
use ddns_core::reconcile::{reconcile, reconcile_into};

#[tokio::test]
async fn first_run_creates_without_deleting() {
    let zone = ZoneProvider::with_values(&[("r1", "10.0.0.1")]);

    let report = reconcile(&zone, HOSTNAME, None, ip("203.0.113.7"))
        .await
        .expect("reconcile succeeds");

    assert!(report.deleted.is_empty());
    assert!(zone.deleted_ids().is_empty());
    assert_eq!(zone.created_values(), vec!["203.0.113.7"]);
    assert_eq!(zone.values(), vec!["10.0.0.1", "203.0.113.7"]);
}

#[tokio::test]
async fn deletes_every_record_with_previous_value() {
    let zone = ZoneProvider::with_values(&[("a1", "1.1.1.1"), ("b", "9.9.9.9"), ("a2", "1.1.1.1")]);

    let report = reconcile(&zone, HOSTNAME, Some(ip("1.1.1.1")), ip("2.2.2.2"))
        .await
        .expect("reconcile succeeds");

    assert_eq!(report.deleted, vec!["a1", "a2"]);
    assert_eq!(report.created.value, "2.2.2.2");
    assert_eq!(
        zone.calls(),
        vec![
            Call::List,
            Call::Delete("a1".to_string()),
            Call::Delete("a2".to_string()),
            Call::Create {
                hostname: HOSTNAME.to_string(),
                value: "2.2.2.2".to_string(),
            },
        ]
    );
    assert_eq!(zone.values(), vec!["9.9.9.9", "2.2.2.2"]);
}

#[tokio::test]
async fn no_matching_records_still_creates() {
    let zone = ZoneProvider::with_values(&[("b", "9.9.9.9")]);

    reconcile(&zone, HOSTNAME, Some(ip("1.1.1.1")), ip("2.2.2.2"))
        .await
        .expect("reconcile succeeds");

    assert!(zone.deleted_ids().is_empty());
    assert_eq!(zone.created_values(), vec!["2.2.2.2"]);
}

#[tokio::test]
async fn created_record_is_a_type_with_default_ttl() {
    let zone = ZoneProvider::new();

    reconcile(&zone, HOSTNAME, None, ip("198.51.100.4"))
        .await
        .expect("reconcile succeeds");

    let records = zone.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].hostname.as_deref(), Some(HOSTNAME));
    assert_eq!(records[0].record_type.as_deref(), Some("A"));
    assert_eq!(records[0].ttl, Some(3600));
}

#[tokio::test]
async fn delete_failure_prevents_create() {
    let zone = ZoneProvider::with_values(&[("a1", "1.1.1.1"), ("a2", "1.1.1.1")]);
    zone.fail_deletes(&[500]);

    let err = reconcile(&zone, HOSTNAME, Some(ip("1.1.1.1")), ip("2.2.2.2"))
        .await
        .expect_err("delete failure aborts");

    assert!(err.to_string().contains("500"));
    assert!(zone.created_values().is_empty());
    // The second delete is never attempted
    assert_eq!(zone.deleted_ids(), vec!["a1"]);
    assert_eq!(zone.values(), vec!["1.1.1.1", "1.1.1.1"]);
}

#[tokio::test]
async fn create_failure_keeps_deletes() {
    let zone = ZoneProvider::with_values(&[("a1", "1.1.1.1")]);
    zone.fail_creates(&[422]);

    let err = reconcile(&zone, HOSTNAME, Some(ip("1.1.1.1")), ip("2.2.2.2"))
        .await
        .expect_err("create failure is reported");

    assert!(err.to_string().contains("422"));
    assert_eq!(zone.deleted_ids(), vec!["a1"]);
    assert!(zone.values().is_empty(), "no rollback of the delete");
}

#[tokio::test]
async fn deletes_before_a_failure_are_accounted_for() {
    let zone = ZoneProvider::with_values(&[("a1", "1.1.1.1"), ("a2", "1.1.1.1")]);
    zone.fail_creates(&[503]);
    let mut deleted = Vec::new();

    reconcile_into(&zone, HOSTNAME, Some(ip("1.1.1.1")), ip("2.2.2.2"), &mut deleted)
        .await
        .expect_err("create failure is reported");
    assert_eq!(deleted, vec!["a1", "a2"]);

    // A second pass appends to the same list
    let created = reconcile_into(&zone, HOSTNAME, Some(ip("1.1.1.1")), ip("2.2.2.2"), &mut deleted)
        .await
        .expect("retry succeeds");
    assert_eq!(created.value, "2.2.2.2");
    assert_eq!(deleted, vec!["a1", "a2"]);
}

#[tokio::test]
async fn list_failure_touches_nothing() {
    let zone = ZoneProvider::with_values(&[("a1", "1.1.1.1")]);
    zone.fail_lists(&[503]);

    reconcile(&zone, HOSTNAME, Some(ip("1.1.1.1")), ip("2.2.2.2"))
        .await
        .expect_err("list failure is reported");

    assert_eq!(zone.calls(), vec![Call::List]);
    assert_eq!(zone.values(), vec!["1.1.1.1"]);
}

#[tokio::test]
async fn repeated_reconcile_finds_nothing_to_delete() {
    let zone = ZoneProvider::with_values(&[("a1", "1.1.1.1")]);

    reconcile(&zone, HOSTNAME, Some(ip("1.1.1.1")), ip("2.2.2.2"))
        .await
        .expect("first reconcile succeeds");
    let second = reconcile(&zone, HOSTNAME, Some(ip("1.1.1.1")), ip("2.2.2.2"))
        .await
        .expect("second reconcile succeeds");

    // Nothing matches the previous value any more
    assert!(second.deleted.is_empty());
    assert_eq!(zone.deleted_ids(), vec!["a1"]);
}

#[tokio::test]
async fn only_records_with_previous_value_are_touched() {
    let zone = ZoneProvider::with_values(&[("a1", "1.2.3.4"), ("a2", "9.9.9.9")]);

    reconcile(&zone, HOSTNAME, Some(ip("1.2.3.4")), ip("5.6.7.8"))
        .await
        .expect("reconcile succeeds");

    assert_eq!(zone.deleted_ids(), vec!["a1"]);
    assert_eq!(zone.created_values(), vec!["5.6.7.8"]);
    assert_eq!(zone.ids()[0], "a2");
    assert_eq!(zone.values(), vec!["9.9.9.9", "5.6.7.8"]);
}
