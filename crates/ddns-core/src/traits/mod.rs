//! Core traits for the DDNS system
//!
//! - [`IpSource`]: Observe the current public address
//! - [`DnsProvider`]: List, delete and create zone records
//! - [`StateStore`]: Persist the last published address

pub mod dns_provider;
pub mod ip_source;
pub mod state_store;

pub use dns_provider::{DEFAULT_TTL, DnsProvider, DnsRecord, NewRecord};
pub use ip_source::IpSource;
pub use state_store::{StateRecord, StateStore};
