//! Core traits for the dynamic DNS endpoint
//!
//! - [`DnsProvider`]: Read and write record sets via provider APIs

pub mod dns_provider;

pub use dns_provider::{DnsProvider, DnsProviderFactory};
