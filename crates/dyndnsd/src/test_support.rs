//! In-memory provider for the daemon's handler tests

use async_trait::async_trait;
use dyndns_core::config::{DynDnsConfig, ProviderConfig};
use dyndns_core::digest::compute_digest;
use dyndns_core::error::{Error, Result};
use dyndns_core::record::{ChangeBatch, ChangeInfo, ChangeStatus, RecordSetQuery, RecordType, ResourceRecordSet};
use dyndns_core::{DnsProvider, Reconciler, StatusMapping};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ZONE_ID: &str = "Z02438639VH134V380MR";
pub const HOSTNAME: &str = "home.example.com.";
pub const SECRET: &str = "correct horse battery staple";

/// Digest a client at `source_ip` would send
pub fn signed_digest(source_ip: &str) -> String {
    compute_digest(source_ip, HOSTNAME, SECRET)
}

/// A single A record set plus call counters
#[derive(Clone, Default)]
pub struct FakeZone {
    values: Arc<Mutex<Vec<String>>>,
    list_calls: Arc<AtomicUsize>,
    change_calls: Arc<AtomicUsize>,
    failure: Option<String>,
    panics: bool,
}

impl FakeZone {
    pub fn with_values(values: &[&str]) -> Self {
        Self {
            values: Arc::new(Mutex::new(values.iter().map(|v| v.to_string()).collect())),
            ..Self::default()
        }
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn reconciler(&self, mapping: StatusMapping) -> Reconciler {
        let mut config = DynDnsConfig::new(
            ZONE_ID,
            HOSTNAME,
            SECRET,
            ProviderConfig::Custom {
                factory: "fake".to_string(),
                config: serde_json::json!({}),
            },
        );
        config.status_mapping = mapping;
        Reconciler::new(config, Box::new(self.clone())).unwrap()
    }

    pub fn values(&self) -> Vec<String> {
        self.values.lock().unwrap().clone()
    }

    pub fn change_calls(&self) -> usize {
        self.change_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst) + self.change_calls()
    }
}

#[async_trait]
impl DnsProvider for FakeZone {
    async fn list_record_sets(&self, query: &RecordSetQuery) -> Result<Vec<ResourceRecordSet>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.panics {
            panic!("fake provider panic");
        }
        if let Some(ref message) = self.failure {
            return Err(Error::provider("fake", message.clone()));
        }

        let values = self.values();
        if values.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![ResourceRecordSet {
            name: query.start_name.clone(),
            record_type: RecordType::A,
            ttl: Some(180),
            values,
        }])
    }

    async fn change_record_sets(&self, _zone_id: &str, batch: &ChangeBatch) -> Result<ChangeInfo> {
        self.change_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(change) = batch.changes.first() {
            *self.values.lock().unwrap() = change.record_set.values.clone();
        }
        Ok(ChangeInfo {
            id: "/change/FAKE".to_string(),
            status: ChangeStatus::Pending,
            submitted_at: None,
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
