//! DNS record model
//!
//! These types describe provider-side state (record sets) and the changes the
//! reconciler asks a provider to apply. They are deliberately close to the
//! Route 53 shapes but carry no wire-format concerns.

use chrono::{DateTime, Utc};
use std::fmt;
use std::net::Ipv4Addr;

/// DNS record type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    Aaaa,
    /// Anything else a provider may list next to the managed record
    Other(String),
}

impl RecordType {
    /// DNS mnemonic for this type
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Other(other) => other,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for RecordType {
    fn from(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            other => RecordType::Other(other.to_string()),
        }
    }
}

/// One record set as reported by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecordSet {
    /// Owner name, fully qualified
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// TTL in seconds (absent for alias records)
    pub ttl: Option<u32>,
    /// Record values in provider order
    pub values: Vec<String>,
}

impl ResourceRecordSet {
    /// Build a single-value A record set
    pub fn a_record(name: impl Into<String>, ip: Ipv4Addr, ttl: u32) -> Self {
        Self {
            name: name.into(),
            record_type: RecordType::A,
            ttl: Some(ttl),
            values: vec![ip.to_string()],
        }
    }
}

/// Parameters of a record-set listing
///
/// Providers return sets in their canonical order starting at
/// `start_name`/`start_type`; nothing guarantees the first entry is the one
/// asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSetQuery {
    /// Hosted zone identifier
    pub zone_id: String,
    /// First name to list
    pub start_name: String,
    /// First type to list at `start_name`
    pub start_type: RecordType,
    /// Maximum number of record sets to return
    pub max_items: u32,
}

/// The managed hostname's A record as currently published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSnapshot {
    /// Fully-qualified hostname (trailing dot)
    pub hostname: String,
    /// Always [`RecordType::A`]
    pub record_type: RecordType,
    /// Values across every matching record set, in provider order
    pub values: Vec<String>,
}

impl RecordSnapshot {
    /// Build a snapshot from a provider listing
    ///
    /// Only sets whose name equals `hostname` exactly and whose type is A are
    /// considered; listings routinely include the alphabetically next record.
    pub fn from_record_sets(hostname: &str, record_sets: &[ResourceRecordSet]) -> Self {
        let values = record_sets
            .iter()
            .filter(|set| set.name == hostname && set.record_type == RecordType::A)
            .flat_map(|set| set.values.iter().cloned())
            .collect();

        Self {
            hostname: hostname.to_string(),
            record_type: RecordType::A,
            values,
        }
    }

    /// Whether the record holds exactly one value equal to `ip`
    pub fn points_at(&self, ip: Ipv4Addr) -> bool {
        matches!(self.values.as_slice(), [only] if value_matches(only, ip))
    }
}

/// Compare a stored record value with an address
///
/// Values that do not parse as IPv4 never match.
pub fn value_matches(value: &str, ip: Ipv4Addr) -> bool {
    value.trim().parse::<Ipv4Addr>().is_ok_and(|stored| stored == ip)
}

/// Change action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    /// Create a record set that must not exist yet
    Create,
    /// Delete an existing record set
    Delete,
    /// Create or replace
    Upsert,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeAction::Create => "CREATE",
            ChangeAction::Delete => "DELETE",
            ChangeAction::Upsert => "UPSERT",
        })
    }
}

/// One change within a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// What to do
    pub action: ChangeAction,
    /// The record set to apply it to
    pub record_set: ResourceRecordSet,
}

/// A batch of changes applied atomically by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBatch {
    /// Free-form comment stored with the change
    pub comment: Option<String>,
    /// Changes in application order
    pub changes: Vec<Change>,
}

impl ChangeBatch {
    /// A batch holding a single UPSERT
    pub fn upsert(record_set: ResourceRecordSet, comment: Option<String>) -> Self {
        Self {
            comment,
            changes: vec![Change {
                action: ChangeAction::Upsert,
                record_set,
            }],
        }
    }
}

/// Propagation status of a submitted change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    /// Accepted, not yet on all authoritative servers
    Pending,
    /// Propagated
    Insync,
}

/// Provider acknowledgement of a change batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeInfo {
    /// Provider change identifier
    pub id: String,
    /// Propagation status
    pub status: ChangeStatus,
    /// When the provider accepted the batch
    pub submitted_at: Option<DateTime<Utc>>,
}
