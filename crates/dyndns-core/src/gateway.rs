//! API-gateway proxy integration
//!
//! When the endpoint sits behind an API gateway with a function (proxy)
//! integration, the gateway hands over a JSON event instead of a raw HTTP
//! request and expects a JSON envelope back. The source address arrives in
//! `requestContext.identity.sourceIp`.

use crate::engine::UpdateRequest;
use crate::response::{CONTENT_TYPE_JSON, UpdateResponse};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Query parameter carrying the digest
pub const HASH_PARAM: &str = "hash";

/// Proxy integration event (only the fields this endpoint reads)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyEvent {
    /// HTTP method of the original request
    #[serde(default)]
    pub http_method: Option<String>,

    /// Query string parameters; `null` when the request had none
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,

    /// Gateway-supplied request metadata
    pub request_context: RequestContext,
}

/// `requestContext` block
#[derive(Debug, Clone, Deserialize)]
pub struct RequestContext {
    pub identity: Identity,
}

/// `requestContext.identity` block
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Caller's address as seen by the gateway
    pub source_ip: String,
}

impl ProxyEvent {
    /// Parse an event document
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether the original request used GET (absent method is accepted)
    pub fn is_get(&self) -> bool {
        self.http_method
            .as_deref()
            .is_none_or(|method| method.eq_ignore_ascii_case("GET"))
    }

    /// Build the update request this event describes
    pub fn to_update_request(&self) -> UpdateRequest {
        let digest = self
            .query_string_parameters
            .as_ref()
            .and_then(|params| params.get(HASH_PARAM))
            .cloned()
            .unwrap_or_default();

        UpdateRequest::new(self.request_context.identity.source_ip.clone(), digest)
    }
}

/// Proxy integration response envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    /// JSON body, as a string
    pub body: String,
}

impl From<&UpdateResponse> for ProxyResponse {
    fn from(response: &UpdateResponse) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string());

        Self {
            status_code: response.status,
            headers,
            body: response.body_json(),
        }
    }
}
