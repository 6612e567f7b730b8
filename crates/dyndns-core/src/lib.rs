// # dyndns-core
//
// Core library for the dynamic DNS update endpoint.
//
// A caller (router, cron script) hits an HTTP endpoint with a digest derived
// from its own address, the target hostname and a shared secret. This crate
// decides what to do with that request; it never speaks HTTP itself and never
// talks to a DNS provider directly.
//
// ## Architecture Overview
//
// - **digest**: Shared-secret digest computation and constant-time verification
// - **DnsProvider**: Trait for reading and writing record sets at a provider
// - **Reconciler**: Validate → read → compare → conditional upsert
// - **UpdateResponse**: Maps a reconciliation result to status + JSON body
// - **ProviderRegistry**: Plugin-based registry for DNS providers
// - **gateway**: Adapter for API-gateway proxy events
//
// ## Design Principles
//
// 1. **Stateless requests**: Every request is reconciled from provider state
// 2. **Explicit outcomes**: Failures are values (`ReconciliationResult`), not unwinding
// 3. **Plugin-Based**: Providers are registered dynamically, no hard-coded if-else
// 4. **Library-First**: The daemon is a thin shell around this crate
// 5. **Idempotency**: A record that already points at the caller is never rewritten

pub mod config;
pub mod digest;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod record;
pub mod registry;
pub mod response;
pub mod traits;

// Re-export core types for convenience
pub use config::{DynDnsConfig, ProviderConfig, ReconcilerConfig, Secret, StatusMapping};
pub use engine::{ReconcilePlan, Reconciler, ReconciliationResult, UpdateRequest};
pub use error::{Error, Result};
pub use record::{ChangeInfo, RecordSnapshot, RecordType, ResourceRecordSet};
pub use registry::ProviderRegistry;
pub use response::{ResponseBody, ReturnStatus, UpdateResponse};
pub use traits::{DnsProvider, DnsProviderFactory};
