//! Test doubles and common utilities for reconciler contract tests
//!
//! `MockDnsProvider` behaves like a tiny hosted zone: listings return the
//! stored record sets (in insertion order, truncated to `max_items`) and
//! UPSERTs replace or insert the matching set, so a second request observes
//! the first one's write.

#![allow(dead_code)]

use dyndns_core::config::{DynDnsConfig, ProviderConfig};
use dyndns_core::digest::compute_digest;
use dyndns_core::error::{Error, Result};
use dyndns_core::record::{
    ChangeAction, ChangeBatch, ChangeInfo, ChangeStatus, RecordSetQuery, RecordType,
    ResourceRecordSet,
};
use dyndns_core::traits::DnsProvider;
use dyndns_core::{Reconciler, UpdateRequest};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ZONE_ID: &str = "Z02438639VH134V380MR";
pub const HOSTNAME: &str = "home.example.com.";
pub const SECRET: &str = "correct horse battery staple";

/// A mock DnsProvider that tracks calls and keeps zone state
pub struct MockDnsProvider {
    /// Call counter for list_record_sets()
    list_call_count: Arc<AtomicUsize>,
    /// Call counter for change_record_sets()
    change_call_count: Arc<AtomicUsize>,
    /// Batches received, in order
    batches: Arc<Mutex<Vec<ChangeBatch>>>,
    /// Queries received, in order
    queries: Arc<Mutex<Vec<RecordSetQuery>>>,
    /// Record sets in the zone
    zone: Arc<Mutex<Vec<ResourceRecordSet>>>,
    /// Fail listings with this message
    list_failure: Option<String>,
    /// Fail changes with this message
    change_failure: Option<String>,
    /// Delay every call by this much
    latency: Option<Duration>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self {
            list_call_count: Arc::new(AtomicUsize::new(0)),
            change_call_count: Arc::new(AtomicUsize::new(0)),
            batches: Arc::new(Mutex::new(Vec::new())),
            queries: Arc::new(Mutex::new(Vec::new())),
            zone: Arc::new(Mutex::new(Vec::new())),
            list_failure: None,
            change_failure: None,
            latency: None,
        }
    }

    /// Seed the zone with an A record set
    pub fn with_a_record(self, name: &str, values: &[&str]) -> Self {
        self.with_record(name, RecordType::A, values)
    }

    /// Seed the zone with an arbitrary record set
    pub fn with_record(self, name: &str, record_type: RecordType, values: &[&str]) -> Self {
        self.zone.lock().unwrap().push(ResourceRecordSet {
            name: name.to_string(),
            record_type,
            ttl: Some(300),
            values: values.iter().map(|v| v.to_string()).collect(),
        });
        self
    }

    pub fn failing_list(mut self, message: &str) -> Self {
        self.list_failure = Some(message.to_string());
        self
    }

    pub fn failing_change(mut self, message: &str) -> Self {
        self.change_failure = Some(message.to_string());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Create a new MockDnsProvider that shares counters and zone state with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            list_call_count: Arc::clone(&other.list_call_count),
            change_call_count: Arc::clone(&other.change_call_count),
            batches: Arc::clone(&other.batches),
            queries: Arc::clone(&other.queries),
            zone: Arc::clone(&other.zone),
            list_failure: other.list_failure.clone(),
            change_failure: other.change_failure.clone(),
            latency: other.latency,
        }
    }

    /// Get the number of times list_record_sets() was called
    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times change_record_sets() was called
    pub fn change_call_count(&self) -> usize {
        self.change_call_count.load(Ordering::SeqCst)
    }

    /// Total provider calls of any kind
    pub fn total_calls(&self) -> usize {
        self.list_call_count() + self.change_call_count()
    }

    pub fn batches(&self) -> Vec<ChangeBatch> {
        self.batches.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<RecordSetQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn zone(&self) -> Vec<ResourceRecordSet> {
        self.zone.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn list_record_sets(&self, query: &RecordSetQuery) -> Result<Vec<ResourceRecordSet>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(ref message) = self.list_failure {
            return Err(Error::provider("mock", message.clone()));
        }

        let zone = self.zone.lock().unwrap();
        Ok(zone.iter().take(query.max_items as usize).cloned().collect())
    }

    async fn change_record_sets(&self, _zone_id: &str, batch: &ChangeBatch) -> Result<ChangeInfo> {
        self.change_call_count.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().unwrap().push(batch.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(ref message) = self.change_failure {
            return Err(Error::dns_provider(message.clone()));
        }

        let mut zone = self.zone.lock().unwrap();
        for change in &batch.changes {
            let set = &change.record_set;
            let existing = zone
                .iter()
                .position(|s| s.name == set.name && s.record_type == set.record_type);
            match (change.action, existing) {
                (ChangeAction::Upsert, Some(i)) => zone[i] = set.clone(),
                (ChangeAction::Upsert | ChangeAction::Create, None) => zone.insert(0, set.clone()),
                (ChangeAction::Delete, Some(i)) => {
                    zone.remove(i);
                }
                (ChangeAction::Create, Some(_)) | (ChangeAction::Delete, None) => {
                    return Err(Error::dns_provider("InvalidChangeBatch"));
                }
            }
        }

        Ok(ChangeInfo {
            id: format!("/change/C{}", self.change_call_count()),
            status: ChangeStatus::Pending,
            submitted_at: None,
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Helper to create a minimal config for testing
pub fn minimal_config() -> DynDnsConfig {
    DynDnsConfig::new(
        ZONE_ID,
        HOSTNAME,
        SECRET,
        ProviderConfig::Custom {
            factory: "mock".to_string(),
            config: serde_json::json!({}),
        },
    )
}

/// Build a reconciler wired to a provider that shares state with `provider`
pub fn reconciler_for(provider: &MockDnsProvider) -> Reconciler {
    Reconciler::new(
        minimal_config(),
        Box::new(MockDnsProvider::sharing_counters_with(provider)),
    )
    .expect("reconciler construction succeeds")
}

/// A request carrying the correct digest for `source_ip`
pub fn signed_request(source_ip: &str) -> UpdateRequest {
    UpdateRequest::new(source_ip, compute_digest(source_ip, HOSTNAME, SECRET))
}
