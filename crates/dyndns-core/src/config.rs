//! Configuration types for the dynamic DNS endpoint
//!
//! The configuration is built once at process start and handed to the
//! [`crate::Reconciler`]. Nothing in this crate reads the environment; the
//! daemon is responsible for populating these structures.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Main endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynDnsConfig {
    /// Hosted zone identifier at the DNS provider
    pub zone_id: String,

    /// Hostname whose A record is managed, as configured
    ///
    /// Clients hash this exact spelling. The provider sees
    /// [`DynDnsConfig::record_name`].
    pub hostname: String,

    /// Secret mixed into the request digest
    pub shared_secret: Secret,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Reconciler tuning
    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    /// How results are mapped onto HTTP status codes
    #[serde(default)]
    pub status_mapping: StatusMapping,
}

impl DynDnsConfig {
    /// Create a configuration with default reconciler settings
    ///
    /// The zone id is normalized (see [`normalize_zone_id`]); the hostname
    /// only loses surrounding whitespace.
    pub fn new(
        zone_id: impl Into<String>,
        hostname: impl Into<String>,
        shared_secret: impl Into<Secret>,
        provider: ProviderConfig,
    ) -> Self {
        let mut config = Self {
            zone_id: zone_id.into(),
            hostname: hostname.into(),
            shared_secret: shared_secret.into(),
            provider,
            reconciler: ReconcilerConfig::default(),
            status_mapping: StatusMapping::default(),
        };
        config.normalize();
        config
    }

    /// Bring the zone id into the form the provider expects
    pub fn normalize(&mut self) {
        self.zone_id = normalize_zone_id(&self.zone_id);
        self.hostname = self.hostname.trim().to_string();
    }

    /// Record name as the provider reports it (lower case, trailing dot)
    pub fn record_name(&self) -> String {
        normalize_hostname(&self.hostname)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.zone_id.is_empty() {
            return Err(crate::Error::config("Zone ID cannot be empty"));
        }
        if self.zone_id.contains('/') {
            return Err(crate::Error::config(format!(
                "Zone ID must be a bare identifier, got: {}",
                self.zone_id
            )));
        }

        validate_hostname(&self.hostname)?;

        if self.shared_secret.is_empty() {
            return Err(crate::Error::config("Shared secret cannot be empty"));
        }

        self.reconciler.validate()?;
        self.provider.validate()?;

        Ok(())
    }
}

/// A secret string that never shows up in `Debug` output
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the raw value. Callers must not log it.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the secret is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<REDACTED>")
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Amazon Route 53
    Route53 {
        /// Access key id
        access_key_id: String,
        /// Secret access key
        secret_access_key: Secret,
        /// Session token for temporary credentials
        #[serde(default)]
        session_token: Option<Secret>,
        /// API endpoint override (defaults to the public Route 53 endpoint)
        #[serde(default)]
        endpoint: Option<String>,
        /// Perform reads but only log writes
        #[serde(default)]
        dry_run: bool,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Route53 {
                access_key_id,
                secret_access_key,
                endpoint,
                ..
            } => {
                if access_key_id.is_empty() {
                    return Err(crate::Error::config("Route 53 access key id cannot be empty"));
                }
                if secret_access_key.is_empty() {
                    return Err(crate::Error::config(
                        "Route 53 secret access key cannot be empty",
                    ));
                }
                if let Some(url) = endpoint
                    && !url.starts_with("https://")
                    && !url.starts_with("http://")
                {
                    return Err(crate::Error::config(format!(
                        "Route 53 endpoint must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Route53 { .. } => "route53",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Reconciler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// TTL written with the A record (in seconds)
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Number of record sets requested when reading current state
    #[serde(default = "default_max_items")]
    pub max_items: u32,

    /// Upper bound for a single provider call (in seconds)
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Comment attached to every change batch
    #[serde(default = "default_change_comment")]
    pub change_comment: String,
}

impl ReconcilerConfig {
    /// Validate the reconciler settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.ttl == 0 {
            return Err(crate::Error::config("TTL must be > 0"));
        }
        if self.max_items == 0 {
            return Err(crate::Error::config("max_items must be > 0"));
        }
        if self.provider_timeout_secs == 0 {
            return Err(crate::Error::config("Provider timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            max_items: default_max_items(),
            provider_timeout_secs: default_provider_timeout_secs(),
            change_comment: default_change_comment(),
        }
    }
}

fn default_ttl() -> u32 {
    180
}

fn default_max_items() -> u32 {
    2
}

fn default_provider_timeout_secs() -> u64 {
    10
}

fn default_change_comment() -> String {
    "Automatic DNS update".to_string()
}

/// HTTP status convention for reconciliation results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusMapping {
    /// 4xx for client problems, 409 for conflicts, 5xx for provider failures
    #[default]
    Strict,
    /// The historical mapping: conflicts answer 200, validation failures 500
    Legacy,
}

impl FromStr for StatusMapping {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "legacy" => Ok(Self::Legacy),
            other => Err(crate::Error::config(format!(
                "Unknown status mapping '{}'. Valid: strict, legacy",
                other
            ))),
        }
    }
}

/// Lower-case the hostname and make it fully qualified
pub fn normalize_hostname(hostname: &str) -> String {
    let hostname = hostname.trim().to_ascii_lowercase();
    if hostname.is_empty() || hostname.ends_with('.') {
        hostname
    } else {
        format!("{hostname}.")
    }
}

/// Strip the `/hostedzone/` prefix some tooling reports zone ids with
pub fn normalize_zone_id(zone_id: &str) -> String {
    let zone_id = zone_id.trim();
    zone_id
        .strip_prefix("/hostedzone/")
        .or_else(|| zone_id.strip_prefix("hostedzone/"))
        .unwrap_or(zone_id)
        .to_string()
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks: total length, label length, characters and hyphen
/// placement. A single trailing dot (root label) is accepted.
pub fn validate_hostname(hostname: &str) -> Result<(), crate::Error> {
    let name = hostname.strip_suffix('.').unwrap_or(hostname);

    if name.is_empty() {
        return Err(crate::Error::config("Hostname cannot be empty"));
    }

    if name.len() > 253 {
        return Err(crate::Error::config(format!(
            "Hostname too long: {} chars (max 253). Got: {}",
            name.len(),
            hostname
        )));
    }

    for label in name.split('.') {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "Hostname has empty label: '{}'",
                hostname
            )));
        }

        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "Hostname label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(crate::Error::config(format!(
                "Hostname label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "Hostname label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}
