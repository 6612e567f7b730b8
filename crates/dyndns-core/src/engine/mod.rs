//! Update reconciler
//!
//! The Reconciler is responsible for:
//! - Verifying the request digest
//! - Reading the hostname's current A record from the provider
//! - Deciding whether a write is needed
//! - Upserting the record when it is missing or stale
//!
//! ## Flow
//!
//! ```text
//! UpdateRequest
//!      │
//!      ▼
//! ┌──────────────┐  malformed / mismatch   ┌──────────────────┐
//! │ digest check │ ──────────────────────▶ │ ValidationFailed │
//! └──────────────┘                         └──────────────────┘
//!      │
//!      ▼
//! ┌──────────────┐  transport / auth       ┌──────────────────┐
//! │ list A sets  │ ──────────────────────▶ │  ProviderError   │
//! └──────────────┘                         └──────────────────┘
//!      │
//!      ▼
//! ┌──────────────┐  one value == source    ┌──────────────────┐
//! │    plan      │ ──────────────────────▶ │  AlreadyCurrent  │
//! └──────────────┘  2+ values ───────────▶ │     Conflict     │
//!      │                                   └──────────────────┘
//!      ▼ 0 values / one stale value
//! ┌──────────────┐
//! │   UPSERT     │ ──▶ Updated | ProviderError
//! └──────────────┘
//! ```
//!
//! There is no locking across requests: two callers with different addresses
//! racing on the same hostname resolve as last-writer-wins. A stale read is
//! never retried.

use crate::config::DynDnsConfig;
use crate::digest::{self, DigestError};
use crate::error::{Error, Result};
use crate::record::{ChangeBatch, ChangeInfo, RecordSetQuery, RecordSnapshot, RecordType, ResourceRecordSet};
use crate::traits::DnsProvider;
use std::fmt;
use std::future::Future;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// An incoming update, as delivered by the HTTP front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    /// Caller's address in textual form
    pub source_ip: String,
    /// Digest supplied in the `hash` query parameter (empty if absent)
    pub supplied_digest: String,
}

impl UpdateRequest {
    /// Create a new update request
    pub fn new(source_ip: impl Into<String>, supplied_digest: impl Into<String>) -> Self {
        Self {
            source_ip: source_ip.into(),
            supplied_digest: supplied_digest.into(),
        }
    }
}

/// Client-side problems with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    /// Digest is not 64 hex characters
    MalformedDigest,
    /// Digest does not match
    DigestMismatch,
    /// Source address cannot be published in an A record
    UnsupportedSourceAddress(String),
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::MalformedDigest => f.write_str("malformed hash"),
            ValidationFailure::DigestMismatch => f.write_str("hash mismatch"),
            ValidationFailure::UnsupportedSourceAddress(addr) => {
                write!(f, "source address {} is not an IPv4 address", addr)
            }
        }
    }
}

impl From<DigestError> for ValidationFailure {
    fn from(err: DigestError) -> Self {
        match err {
            DigestError::Malformed => ValidationFailure::MalformedDigest,
            DigestError::Mismatch => ValidationFailure::DigestMismatch,
        }
    }
}

/// Outcome of one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationResult {
    /// The record already held exactly the source address; nothing written
    AlreadyCurrent {
        /// Managed hostname
        hostname: String,
        /// Published address
        ip: Ipv4Addr,
    },

    /// The record was upserted to the source address
    Updated {
        /// Managed hostname
        hostname: String,
        /// Newly published address
        ip: Ipv4Addr,
        /// Values the record held before (empty if it did not exist)
        previous: Vec<String>,
        /// Provider acknowledgement
        change: ChangeInfo,
    },

    /// The record holds several values; it is left untouched
    Conflict {
        /// Managed hostname
        hostname: String,
        /// Short reason
        reason: String,
        /// Values found
        values: Vec<String>,
    },

    /// The request was rejected before any provider call
    ValidationFailed(ValidationFailure),

    /// The provider failed, rejected the change, or timed out
    ProviderError {
        /// Server-side detail; never returned to the caller
        detail: String,
    },
}

impl ReconciliationResult {
    /// `AlreadyCurrent` or `Updated`
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ReconciliationResult::AlreadyCurrent { .. } | ReconciliationResult::Updated { .. }
        )
    }
}

/// What the reconciler intends to do with a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcilePlan {
    /// Single value equal to the source address
    AlreadyCurrent,
    /// More than one value
    Conflict,
    /// Missing or stale; write the source address
    Upsert {
        /// Values being replaced
        previous: Vec<String>,
    },
}

/// Decide what to do with the current record for `ip`
pub fn plan(snapshot: &RecordSnapshot, ip: Ipv4Addr) -> ReconcilePlan {
    match snapshot.values.len() {
        0 => ReconcilePlan::Upsert { previous: Vec::new() },
        1 if snapshot.points_at(ip) => ReconcilePlan::AlreadyCurrent,
        1 => ReconcilePlan::Upsert {
            previous: snapshot.values.clone(),
        },
        _ => ReconcilePlan::Conflict,
    }
}

/// Request-scoped reconciler
///
/// Constructed once at startup with the configuration and a provider, then
/// shared by every request. It holds no mutable state.
pub struct Reconciler {
    /// Validated, normalized configuration
    config: DynDnsConfig,

    /// Provider-side name of the managed record
    record_name: String,

    /// DNS provider for reading and writing records
    provider: Box<dyn DnsProvider>,

    /// Bound applied to each provider call
    provider_timeout: Duration,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// The configuration is normalized and validated here.
    pub fn new(mut config: DynDnsConfig, provider: Box<dyn DnsProvider>) -> Result<Self> {
        config.normalize();
        config.validate()?;

        let provider_timeout = Duration::from_secs(config.reconciler.provider_timeout_secs);
        let record_name = config.record_name();

        Ok(Self {
            config,
            record_name,
            provider,
            provider_timeout,
        })
    }

    /// The configuration this reconciler was built with
    pub fn config(&self) -> &DynDnsConfig {
        &self.config
    }

    /// Name of the underlying provider
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Reconcile one update request
    ///
    /// Never fails: every outcome, including provider failures, is a
    /// [`ReconciliationResult`].
    pub async fn reconcile(&self, request: &UpdateRequest) -> ReconciliationResult {
        let hostname = &self.record_name;
        info!("Source IP set to {}", request.source_ip);

        // Clients hash the hostname exactly as it was configured
        if let Err(e) = digest::verify(
            &request.source_ip,
            &self.config.hostname,
            self.config.shared_secret.expose(),
            &request.supplied_digest,
        ) {
            warn!("Rejected update from {}: {}", request.source_ip, e);
            return ReconciliationResult::ValidationFailed(e.into());
        }

        let ip: Ipv4Addr = match request.source_ip.trim().parse() {
            Ok(ip) => ip,
            Err(_) => {
                warn!("Rejected update from {}: not an IPv4 address", request.source_ip);
                return ReconciliationResult::ValidationFailed(
                    ValidationFailure::UnsupportedSourceAddress(request.source_ip.clone()),
                );
            }
        };

        debug!("Getting record set for {}", hostname);
        let snapshot = match self.read_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Failed to read record set for {}: {}", hostname, e);
                return ReconciliationResult::ProviderError {
                    detail: e.to_string(),
                };
            }
        };

        match plan(&snapshot, ip) {
            ReconcilePlan::AlreadyCurrent => {
                info!("IP {} already set in DNS A record for {}", ip, hostname);
                ReconciliationResult::AlreadyCurrent {
                    hostname: hostname.clone(),
                    ip,
                }
            }
            ReconcilePlan::Conflict => {
                warn!(
                    "Record {} holds {} values ({:?}), refusing to overwrite",
                    hostname,
                    snapshot.values.len(),
                    snapshot.values
                );
                ReconciliationResult::Conflict {
                    hostname: hostname.clone(),
                    reason: "multiple values present".to_string(),
                    values: snapshot.values,
                }
            }
            ReconcilePlan::Upsert { previous } => {
                info!("Changing IP for {} to {} (previous: {:?})", hostname, ip, previous);
                match self.upsert(ip).await {
                    Ok(change) => {
                        info!(
                            "Updated DNS A record for {} to {} (change {}, {:?})",
                            hostname, ip, change.id, change.status
                        );
                        ReconciliationResult::Updated {
                            hostname: hostname.clone(),
                            ip,
                            previous,
                            change,
                        }
                    }
                    Err(e) => {
                        error!("Failed to update DNS A record for {}: {}", hostname, e);
                        ReconciliationResult::ProviderError {
                            detail: e.to_string(),
                        }
                    }
                }
            }
        }
    }

    /// Read the managed hostname's A record
    ///
    /// Only record sets whose name equals the record name are kept.
    async fn read_snapshot(&self) -> Result<RecordSnapshot> {
        let query = RecordSetQuery {
            zone_id: self.config.zone_id.clone(),
            start_name: self.record_name.clone(),
            start_type: RecordType::A,
            max_items: self.config.reconciler.max_items,
        };

        let record_sets = self
            .bounded("list record sets", self.provider.list_record_sets(&query))
            .await?;

        debug!("Provider returned {} record set(s)", record_sets.len());
        Ok(RecordSnapshot::from_record_sets(&self.record_name, &record_sets))
    }

    /// Point the hostname at `ip` with a single-value UPSERT
    async fn upsert(&self, ip: Ipv4Addr) -> Result<ChangeInfo> {
        let record = ResourceRecordSet::a_record(
            self.record_name.clone(),
            ip,
            self.config.reconciler.ttl,
        );
        let comment = Some(self.config.reconciler.change_comment.clone())
            .filter(|comment| !comment.is_empty());
        let batch = ChangeBatch::upsert(record, comment);

        self.bounded(
            "change record sets",
            self.provider.change_record_sets(&self.config.zone_id, &batch),
        )
        .await
    }

    /// Run a provider call under the configured timeout
    async fn bounded<T>(&self, operation: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.provider_timeout, call).await {
            Ok(result) => result.map_err(|e| match e {
                Error::Provider { .. } => e,
                other => Error::provider(self.provider.provider_name(), other.to_string()),
            }),
            Err(_) => Err(Error::timeout(format!(
                "{} did not complete within {:?}",
                operation, self.provider_timeout
            ))),
        }
    }
}
