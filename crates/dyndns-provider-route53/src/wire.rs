//! Route 53 REST/XML documents (API version 2013-04-01)
//!
//! Only the elements this provider reads or writes are modelled; unknown
//! elements in responses are ignored.

use chrono::{DateTime, Utc};
use dyndns_core::record::{
    ChangeBatch, ChangeInfo, ChangeStatus, RecordType, ResourceRecordSet,
};
use serde::{Deserialize, Serialize};

/// Namespace of every request document
pub const ROUTE53_XMLNS: &str = "https://route53.amazonaws.com/doc/2013-04-01/";

/// Response to `GET /2013-04-01/hostedzone/{Id}/rrset`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListResourceRecordSetsResponse {
    pub resource_record_sets: ResourceRecordSets,
    #[serde(default)]
    pub is_truncated: bool,
    #[serde(default)]
    pub next_record_name: Option<String>,
    #[serde(default)]
    pub next_record_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResourceRecordSets {
    #[serde(rename = "ResourceRecordSet", default)]
    pub sets: Vec<XmlRecordSet>,
}

/// `<ResourceRecordSet>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct XmlRecordSet {
    pub name: String,
    #[serde(rename = "Type")]
    pub record_type: String,
    #[serde(rename = "TTL", default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// Absent for alias records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_records: Option<ResourceRecords>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecords {
    #[serde(rename = "ResourceRecord", default)]
    pub records: Vec<ResourceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceRecord {
    pub value: String,
}

impl From<XmlRecordSet> for ResourceRecordSet {
    fn from(set: XmlRecordSet) -> Self {
        Self {
            name: set.name,
            record_type: RecordType::from(set.record_type.as_str()),
            ttl: set.ttl,
            values: set
                .resource_records
                .map(|rr| rr.records.into_iter().map(|r| r.value).collect())
                .unwrap_or_default(),
        }
    }
}

impl From<&ResourceRecordSet> for XmlRecordSet {
    fn from(set: &ResourceRecordSet) -> Self {
        Self {
            name: set.name.clone(),
            record_type: set.record_type.to_string(),
            ttl: set.ttl,
            resource_records: Some(ResourceRecords {
                records: set
                    .values
                    .iter()
                    .map(|value| ResourceRecord { value: value.clone() })
                    .collect(),
            }),
        }
    }
}

/// Body of `POST /2013-04-01/hostedzone/{Id}/rrset/`
#[derive(Debug, Serialize)]
#[serde(rename = "ChangeResourceRecordSetsRequest")]
pub struct ChangeResourceRecordSetsRequest {
    #[serde(rename = "@xmlns")]
    pub xmlns: &'static str,
    #[serde(rename = "ChangeBatch")]
    pub change_batch: XmlChangeBatch,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct XmlChangeBatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub changes: XmlChanges,
}

#[derive(Debug, Serialize)]
pub struct XmlChanges {
    #[serde(rename = "Change")]
    pub changes: Vec<XmlChange>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct XmlChange {
    pub action: String,
    pub resource_record_set: XmlRecordSet,
}

impl From<&ChangeBatch> for ChangeResourceRecordSetsRequest {
    fn from(batch: &ChangeBatch) -> Self {
        Self {
            xmlns: ROUTE53_XMLNS,
            change_batch: XmlChangeBatch {
                comment: batch.comment.clone(),
                changes: XmlChanges {
                    changes: batch
                        .changes
                        .iter()
                        .map(|change| XmlChange {
                            action: change.action.to_string(),
                            resource_record_set: XmlRecordSet::from(&change.record_set),
                        })
                        .collect(),
                },
            },
        }
    }
}

impl ChangeResourceRecordSetsRequest {
    /// Serialize as a complete XML document
    pub fn to_xml(&self) -> Result<String, quick_xml::SeError> {
        let body = quick_xml::se::to_string(self)?;
        Ok(format!(r#"<?xml version="1.0" encoding="UTF-8"?>{body}"#))
    }
}

/// Response to a change submission
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeResourceRecordSetsResponse {
    pub change_info: XmlChangeInfo,
}

/// `<ChangeInfo>`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct XmlChangeInfo {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub submitted_at: Option<String>,
}

impl From<XmlChangeInfo> for ChangeInfo {
    fn from(info: XmlChangeInfo) -> Self {
        let status = if info.status.eq_ignore_ascii_case("INSYNC") {
            ChangeStatus::Insync
        } else {
            ChangeStatus::Pending
        };
        let submitted_at = info
            .submitted_at
            .as_deref()
            .and_then(|at| DateTime::parse_from_rfc3339(at).ok())
            .map(|at| at.with_timezone(&Utc));

        Self {
            id: info.id,
            status,
            submitted_at,
        }
    }
}

/// Generic error document
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorResponse {
    pub error: ErrorDetail,
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorDetail {
    #[serde(rename = "Type", default)]
    pub kind: Option<String>,
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error document returned when a change batch is rejected
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvalidChangeBatch {
    pub messages: Messages,
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Messages {
    #[serde(rename = "Message", default)]
    pub messages: Vec<String>,
}

/// Longest raw body quoted in an error message
const MAX_RAW_ERROR_LEN: usize = 256;

/// Summarize an error body as `Code: Message`
///
/// Falls back to a truncated copy of the body when it is not a recognised
/// error document.
pub fn describe_error(body: &str) -> String {
    if let Ok(response) = quick_xml::de::from_str::<ErrorResponse>(body) {
        let error = response.error;
        return match error.message {
            Some(message) => format!("{}: {}", error.code, message),
            None => error.code,
        };
    }

    if let Ok(batch) = quick_xml::de::from_str::<InvalidChangeBatch>(body)
        && !batch.messages.messages.is_empty()
    {
        return format!("InvalidChangeBatch: {}", batch.messages.messages.join("; "));
    }

    let body = body.trim();
    match body.char_indices().nth(MAX_RAW_ERROR_LEN) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
