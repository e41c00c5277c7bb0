// # IP Source Trait
//
// Defines the interface for observing the caller's current public address.
//
// ## Implementations
//
// - HTTP echo service: `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::IpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//
//     let current_ip = source.current().await?;
//     println!("Current IP: {}", current_ip);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for IP source implementations
///
/// An IP source performs a single best-effort lookup per call. It does not
/// retry, cache, or decide whether DNS needs updating; the engine asks once
/// per cycle and treats an error as "no observation".
///
/// ## Forbidden Capabilities
/// - ❌ Perform DNS updates (use `DnsProvider`)
/// - ❌ Access state store directly (use `DdnsEngine`)
/// - ❌ Implement retry logic or polling loops (owned by `DdnsEngine`)
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: A validated address
    /// - `Err(Error)`: Lookup failed or the answer was not an IPv4 address
    async fn current(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Short name used in log lines
    fn source_name(&self) -> &'static str;
}
