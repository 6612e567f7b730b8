//! Response formatting
//!
//! Every [`ReconciliationResult`] becomes a status code plus the JSON body
//! `{"return_status": ..., "return_message": ...}`. Provider and internal
//! failures only ever expose an opaque message; details stay in the logs.

use crate::config::StatusMapping;
use crate::engine::{ReconciliationResult, ValidationFailure};
use serde::{Deserialize, Serialize};

/// Content type of every response body
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Message returned for failures whose detail must not leave the server
pub const OPAQUE_FAILURE_MESSAGE: &str = "see logs for more information";

/// Coarse outcome reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnStatus {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "fail")]
    Fail,
    #[serde(rename = "internal error")]
    InternalError,
}

/// JSON body returned to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBody {
    pub return_status: ReturnStatus,
    pub return_message: String,
}

/// Status code and body for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResponse {
    /// HTTP status code
    pub status: u16,
    /// JSON body
    pub body: ResponseBody,
}

impl UpdateResponse {
    /// Build a response
    pub fn new(status: u16, return_status: ReturnStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ResponseBody {
                return_status,
                return_message: message.into(),
            },
        }
    }

    /// Map a reconciliation result under the given status convention
    pub fn from_result(result: &ReconciliationResult, mapping: StatusMapping) -> Self {
        let strict = mapping == StatusMapping::Strict;

        match result {
            ReconciliationResult::AlreadyCurrent { hostname, ip } => Self::new(
                200,
                ReturnStatus::Success,
                format!("IP {} already set in DNS A record for {}", ip, hostname),
            ),
            ReconciliationResult::Updated { hostname, ip, .. } => Self::new(
                200,
                ReturnStatus::Success,
                format!("Updated DNS A record for {} to {}", hostname, ip),
            ),
            ReconciliationResult::Conflict { hostname, .. } => Self::new(
                if strict { 409 } else { 200 },
                ReturnStatus::Fail,
                format!(
                    "You should only have a single value for your dynamic record {}. \
                    You currently have more than one.",
                    hostname
                ),
            ),
            ReconciliationResult::ValidationFailed(failure) => {
                let status = match (strict, failure) {
                    (false, _) => 500,
                    (true, ValidationFailure::DigestMismatch) => 403,
                    (true, _) => 400,
                };
                Self::new(status, ReturnStatus::Fail, failure.to_string())
            }
            ReconciliationResult::ProviderError { .. } => Self::new(
                if strict { 502 } else { 500 },
                ReturnStatus::InternalError,
                OPAQUE_FAILURE_MESSAGE,
            ),
        }
    }

    /// Response for faults nobody anticipated (panics, serialization bugs)
    pub fn internal_error() -> Self {
        Self::new(500, ReturnStatus::InternalError, OPAQUE_FAILURE_MESSAGE)
    }

    /// Serialize the body
    pub fn body_json(&self) -> String {
        // ResponseBody holds only strings and unit variants
        serde_json::to_string(&self.body).unwrap_or_else(|_| {
            format!(
                r#"{{"return_status":"internal error","return_message":"{}"}}"#,
                OPAQUE_FAILURE_MESSAGE
            )
        })
    }
}
