// # Route 53 DNS Provider
//
// This crate provides an Amazon Route 53 DNS provider for the dynamic DNS
// endpoint.
//
// ## Implementation Status
//
// - ✅ One HTTP request per provider call (list or change)
// - ✅ Full error propagation to the reconciler
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Specific error handling for HTTP status codes (400, 403, 404, 429, 5xx)
// - ✅ AWS Signature Version 4 (with optional session token)
// - ✅ Dry-run mode for safe testing
// - ✅ Endpoint override (local emulators, tests)
// - ❌ NO retry logic (a failed call surfaces as ProviderError)
// - ❌ NO pagination (the reconciler only ever reads the first page)
// - ❌ NO change-status polling (PENDING is reported as accepted)
// - ❌ NO background tasks
//
// ## Trust Level: Untrusted (DNS Provider)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTPS API calls to the configured endpoint only
// - ✅ Parse Route 53 XML responses
//
// **Forbidden Capabilities**:
// - ❌ Spawn tasks or threads
// - ❌ Implement retry logic
// - ❌ Make decisions about record contents (owned by the Reconciler)
//
// ## Security Requirements
//
// - Secret access key and session token NEVER appear in logs
// - Provider MUST fail fast if credentials are empty
//
// ## API Reference
//
// - List record sets: GET `/2013-04-01/hostedzone/{Id}/rrset?name=...&type=...&maxitems=...`
// - Change record sets: POST `/2013-04-01/hostedzone/{Id}/rrset/`

pub mod sign;
pub mod wire;

use async_trait::async_trait;
use chrono::Utc;
use dyndns_core::config::ProviderConfig;
use dyndns_core::record::{ChangeBatch, ChangeInfo, ChangeStatus, RecordSetQuery, ResourceRecordSet};
use dyndns_core::traits::{DnsProvider, DnsProviderFactory};
use dyndns_core::{Error, Result};
use reqwest::{Method, StatusCode, Url};
use std::time::Duration;

pub use sign::Credentials;

/// Public Route 53 endpoint
pub const ROUTE53_ENDPOINT: &str = "https://route53.amazonaws.com";

/// Route 53 is global; requests are always signed for this region
pub const SIGNING_REGION: &str = "us-east-1";

/// Service name in the credential scope
pub const SIGNING_SERVICE: &str = "route53";

/// API version prefix of every path
const API_VERSION: &str = "2013-04-01";

/// Provider name used in errors and the registry
const PROVIDER_NAME: &str = "route53";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Amazon Route 53 DNS provider
///
/// # Trust Level: Untrusted
///
/// This provider is isolated, stateless, and single-shot. All decisions about
/// what to write are owned by the `Reconciler`.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform listings
/// - Log the change document it would have submitted
/// - **NOT** submit the change
pub struct Route53Provider {
    /// Signing credentials
    credentials: Credentials,

    /// API base URL without trailing slash
    endpoint: String,

    /// Value of the `host` header (with port when non-default)
    host: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, list but skip change submissions
    dry_run: bool,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for Route53Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route53Provider")
            .field("access_key_id", &self.credentials.access_key_id)
            .field("secret_access_key", &"<REDACTED>")
            .field("endpoint", &self.endpoint)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Route53Provider {
    /// Create a new Route 53 provider
    ///
    /// # Parameters
    ///
    /// - `credentials`: access key pair allowed to list and change record sets in the zone
    /// - `endpoint`: API base URL; `None` selects the public endpoint
    /// - `dry_run`: If true, list record sets but skip change submissions
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)` if the credentials are empty or the endpoint is not a URL
    pub fn new(credentials: Credentials, endpoint: Option<String>, dry_run: bool) -> Result<Self> {
        if credentials.access_key_id.is_empty() {
            return Err(Error::config("Route 53 access key id cannot be empty"));
        }
        if credentials.secret_access_key.is_empty() {
            return Err(Error::config("Route 53 secret access key cannot be empty"));
        }

        let endpoint = endpoint
            .unwrap_or_else(|| ROUTE53_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();
        let url = Url::parse(&endpoint)
            .map_err(|e| Error::config(format!("Invalid Route 53 endpoint {}: {}", endpoint, e)))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(Error::config(format!(
                    "Route 53 endpoint has no host: {}",
                    endpoint
                )));
            }
        };

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            endpoint,
            host,
            client,
            dry_run,
        })
    }

    /// Create a provider against the public endpoint (live mode)
    pub fn new_live(credentials: Credentials) -> Result<Self> {
        Self::new(credentials, None, false)
    }

    /// Create a provider against the public endpoint (dry-run mode)
    pub fn new_dry_run(credentials: Credentials) -> Result<Self> {
        Self::new(credentials, None, true)
    }

    /// Whether change submissions are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn rrset_path(zone_id: &str) -> String {
        format!("/{}/hostedzone/{}/rrset", API_VERSION, zone_id)
    }

    /// Sign and send one request, returning the response body
    ///
    /// Non-2xx responses are turned into provider errors carrying the Route 53
    /// error code and message.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<String>,
    ) -> Result<String> {
        let amz_date = Utc::now();
        let amz_date_header = amz_date.format(sign::AMZ_DATE_FORMAT).to_string();

        let mut headers: Vec<(&str, &str)> = vec![
            ("host", self.host.as_str()),
            ("x-amz-date", amz_date_header.as_str()),
        ];
        if let Some(ref token) = self.credentials.session_token {
            headers.push(("x-amz-security-token", token.expose()));
        }

        let payload = body.as_deref().unwrap_or_default();
        let authorization = sign::authorization(
            &self.credentials,
            &sign::SignableRequest {
                method: method.as_str(),
                path,
                query,
                headers: &headers,
                payload: payload.as_bytes(),
            },
            amz_date,
            SIGNING_REGION,
            SIGNING_SERVICE,
        );

        let mut url = format!("{}{}", self.endpoint, sign::canonical_uri(path));
        let query_string = sign::canonical_query(query);
        if !query_string.is_empty() {
            url.push('?');
            url.push_str(&query_string);
        }

        tracing::debug!("Route 53 request: {} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .header("x-amz-date", &amz_date_header)
            .header("authorization", authorization);
        if let Some(ref token) = self.credentials.session_token {
            request = request.header("x-amz-security-token", token.expose());
        }
        if let Some(body) = body {
            request = request.header("content-type", "text/xml").body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response body".to_string());

        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        Ok(text)
    }
}

/// Map a non-2xx response onto a typed error
///
/// Throttling, credential and request rejections get their own variants; the
/// rest are provider errors. The reconciler attributes all of them to
/// Route 53 when it reports the failure.
fn status_error(status: StatusCode, body: &str) -> Error {
    let detail = wire::describe_error(body);
    let throttled = detail.starts_with("Throttling") || detail.starts_with("PriorRequestNotComplete");

    match status.as_u16() {
        429 => Error::rate_limited(format!("Please retry later. {}", detail)),
        400 if throttled => Error::rate_limited(format!("Please retry later. {}", detail)),
        400 => Error::invalid_input(format!("Request rejected: {} - {}", status, detail)),
        401 | 403 => Error::auth(format!(
            "invalid credentials or insufficient permissions. Status: {} - {}",
            status, detail
        )),
        404 => Error::provider(
            PROVIDER_NAME,
            format!("Hosted zone or record not found: {}", detail),
        ),
        500..=599 => Error::provider(
            PROVIDER_NAME,
            format!("Route 53 server error (transient): {} - {}", status, detail),
        ),
        _ => Error::provider(
            PROVIDER_NAME,
            format!("Request failed: {} - {}", status, detail),
        ),
    }
}

#[async_trait]
impl DnsProvider for Route53Provider {
    /// List record sets starting at the query's name and type
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /2013-04-01/hostedzone/{Id}/rrset?maxitems=2&name=home.example.com.&type=A
    /// ```
    async fn list_record_sets(&self, query: &RecordSetQuery) -> Result<Vec<ResourceRecordSet>> {
        let path = Self::rrset_path(&query.zone_id);
        let max_items = query.max_items.to_string();
        let params = [
            ("maxitems", max_items.as_str()),
            ("name", query.start_name.as_str()),
            ("type", query.start_type.as_str()),
        ];

        let body = self.send(Method::GET, &path, &params, None).await?;

        let response: wire::ListResourceRecordSetsResponse = quick_xml::de::from_str(&body)
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("Failed to parse response: {}", e)))?;

        if response.is_truncated {
            tracing::debug!(
                "Listing truncated; next record {:?} ({:?})",
                response.next_record_name,
                response.next_record_type
            );
        }

        Ok(response
            .resource_record_sets
            .sets
            .into_iter()
            .map(ResourceRecordSet::from)
            .collect())
    }

    /// Submit a change batch
    ///
    /// # API Call (skipped in dry-run mode)
    ///
    /// ```http
    /// POST /2013-04-01/hostedzone/{Id}/rrset/
    /// <ChangeResourceRecordSetsRequest xmlns="https://route53.amazonaws.com/doc/2013-04-01/">
    ///   <ChangeBatch>...</ChangeBatch>
    /// </ChangeResourceRecordSetsRequest>
    /// ```
    async fn change_record_sets(&self, zone_id: &str, batch: &ChangeBatch) -> Result<ChangeInfo> {
        let path = format!("{}/", Self::rrset_path(zone_id));
        let document = wire::ChangeResourceRecordSetsRequest::from(batch)
            .to_xml()
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("Failed to encode change batch: {}", e)))?;

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                path,
                document
            );
            return Ok(ChangeInfo {
                id: "/change/DRY-RUN".to_string(),
                status: ChangeStatus::Pending,
                submitted_at: Some(Utc::now()),
            });
        }

        let body = self.send(Method::POST, &path, &[], Some(document)).await?;

        let response: wire::ChangeResourceRecordSetsResponse = quick_xml::de::from_str(&body)
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("Failed to parse response: {}", e)))?;

        Ok(ChangeInfo::from(response.change_info))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Factory for creating Route 53 providers
pub struct Route53Factory;

impl DnsProviderFactory for Route53Factory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Route53 {
                access_key_id,
                secret_access_key,
                session_token,
                endpoint,
                dry_run,
            } => {
                if *dry_run {
                    tracing::warn!("Route 53 provider running in DRY-RUN mode - no changes will be made");
                }

                let credentials = Credentials {
                    access_key_id: access_key_id.clone(),
                    secret_access_key: secret_access_key.clone(),
                    session_token: session_token.clone(),
                };

                Ok(Box::new(Route53Provider::new(
                    credentials,
                    endpoint.clone(),
                    *dry_run,
                )?))
            }
            _ => Err(Error::config("Invalid config for Route 53 provider")),
        }
    }
}

/// Register the Route 53 provider with a registry
///
/// # Example
///
/// ```rust
/// use dyndns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// dyndns_provider_route53::register(&registry);
/// assert!(registry.has_provider("route53"));
/// ```
pub fn register(registry: &dyndns_core::ProviderRegistry) {
    registry.register_provider(PROVIDER_NAME, Box::new(Route53Factory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyndns_core::Secret;

    fn credentials() -> Credentials {
        Credentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: Secret::new("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"),
            session_token: Some(Secret::new("session-token-value")),
        }
    }

    fn route53_config(access_key_id: &str, dry_run: bool) -> ProviderConfig {
        ProviderConfig::Route53 {
            access_key_id: access_key_id.to_string(),
            secret_access_key: Secret::new("secret"),
            session_token: None,
            endpoint: None,
            dry_run,
        }
    }

    #[test]
    fn test_factory_creation() {
        let provider = Route53Factory.create(&route53_config("AKID", false));
        assert!(provider.is_ok());
        assert_eq!(provider.unwrap().provider_name(), "route53");
    }

    #[test]
    fn test_factory_missing_key() {
        assert!(Route53Factory.create(&route53_config("", false)).is_err());
    }

    #[test]
    fn test_factory_rejects_foreign_config() {
        let config = ProviderConfig::Custom {
            factory: "other".to_string(),
            config: serde_json::Value::Bool(true),
        };
        assert!(Route53Factory.create(&config).is_err());
    }

    #[test]
    fn test_dry_run_mode() {
        let dry = Route53Provider::new_dry_run(credentials()).unwrap();
        let live = Route53Provider::new_live(credentials()).unwrap();

        assert!(dry.is_dry_run(), "Dry-run provider should have dry_run=true");
        assert!(!live.is_dry_run(), "Live provider should have dry_run=false");
    }

    #[test]
    fn test_host_header_includes_non_default_port() {
        let local =
            Route53Provider::new(credentials(), Some("http://127.0.0.1:4566/".to_string()), false)
                .unwrap();
        assert_eq!(local.host, "127.0.0.1:4566");
        assert_eq!(local.endpoint, "http://127.0.0.1:4566");

        let public = Route53Provider::new_live(credentials()).unwrap();
        assert_eq!(public.host, "route53.amazonaws.com");
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        assert!(Route53Provider::new(credentials(), Some("not a url".to_string()), false).is_err());
    }

    #[test]
    fn test_credentials_not_exposed_in_debug() {
        let provider = Route53Provider::new_live(credentials()).unwrap();
        let debug_str = format!("{:?}", provider);

        assert!(!debug_str.contains("wJalrXUtnFEMI"));
        assert!(!debug_str.contains("session-token-value"));
        assert!(debug_str.contains("Route53Provider"));
    }

    #[test]
    fn test_status_mapping() {
        let throttled = status_error(
            StatusCode::BAD_REQUEST,
            "<ErrorResponse><Error><Code>Throttling</Code><Message>Rate exceeded</Message></Error></ErrorResponse>",
        );
        assert!(matches!(throttled, Error::RateLimited(_)));

        let too_many = status_error(StatusCode::TOO_MANY_REQUESTS, "");
        assert!(matches!(too_many, Error::RateLimited(_)));

        let denied = status_error(StatusCode::FORBIDDEN, "");
        assert!(matches!(denied, Error::Authentication(_)));
        assert!(denied.to_string().contains("Authentication failed"));

        let rejected = status_error(
            StatusCode::BAD_REQUEST,
            "<InvalidChangeBatch><Messages><Message>bad</Message></Messages></InvalidChangeBatch>",
        );
        assert!(matches!(rejected, Error::InvalidInput(_)));

        let unavailable = status_error(StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable");
        assert!(unavailable.to_string().contains("transient"));
        assert!(matches!(unavailable, Error::Provider { ref provider, .. } if provider == "route53"));
    }

    #[test]
    fn test_register() {
        let registry = dyndns_core::ProviderRegistry::new();
        register(&registry);
        assert!(registry.has_provider("route53"));
    }
}
