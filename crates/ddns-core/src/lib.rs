// # ddns-core
//
// Core library for the Netlify dynamic DNS updater.
//
// ## Architecture Overview
//
// - **IpSource**: Trait for observing the current public IPv4 address
// - **DnsProvider**: Trait exposing the provider's list/delete/create primitives
// - **StateStore**: Trait for remembering the last published address
// - **reconcile**: Delete-then-create convergence of the zone's A record
// - **DdnsEngine**: Polling loop that ties the pieces together
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from HTTP implementations
// 2. **Library-First**: All core functionality can be used as a library
// 3. **Errors as values**: Providers report failures, the engine decides what to do
// 4. **Idempotency**: Value-matching deletes make a repeated reconcile harmless

pub mod config;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{
    DdnsConfig, EngineConfig, IpSourceConfig, ProviderConfig, RecordConfig, StateStoreConfig,
};
pub use engine::{CycleOutcome, DdnsEngine, EngineEvent, LoopState};
pub use error::{Error, Result};
pub use reconcile::{ReconcileReport, reconcile};
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{DnsProvider, DnsRecord, IpSource, NewRecord, StateStore};
