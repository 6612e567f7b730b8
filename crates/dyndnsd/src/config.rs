//! Environment configuration
//!
//! Configuration is via environment variables ONLY. Parsing goes through a
//! lookup function so it can be exercised without touching the process
//! environment.

use anyhow::{Context, Result};
use dyndns_core::config::{validate_hostname, DynDnsConfig, ProviderConfig, StatusMapping};
use dyndns_core::Secret;
use hyper::header::HeaderName;
use std::env;
use std::net::SocketAddr;
use tracing::Level;

/// How the daemon receives requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Listen for HTTP requests until signalled
    Serve,
    /// Read one proxy event from stdin, write the proxy response to stdout
    Event,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub zone_id: String,
    pub hostname: String,
    pub shared_secret: Secret,
    pub access_key_id: String,
    pub secret_access_key: Secret,
    pub session_token: Option<Secret>,
    pub route53_endpoint: Option<String>,
    pub dry_run: bool,
    pub listen_addr: SocketAddr,
    pub path: String,
    pub source_ip_header: Option<String>,
    pub status_mapping: StatusMapping,
    pub ttl: u32,
    pub provider_timeout_secs: u64,
    pub run_mode: RunMode,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            optional(key).with_context(|| {
                format!("{key} is required. Set it via: export {key}=...")
            })
        };

        let dry_run = match optional("DYNDNS_MODE").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("live") => false,
            Some("dry-run") => true,
            Some(other) => anyhow::bail!(
                "DYNDNS_MODE '{}' is not valid. Valid modes: live, dry-run",
                other
            ),
        };

        let run_mode = match optional("DYNDNS_RUN_MODE").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("serve") => RunMode::Serve,
            Some("event") => RunMode::Event,
            Some(other) => anyhow::bail!(
                "DYNDNS_RUN_MODE '{}' is not valid. Valid modes: serve, event",
                other
            ),
        };

        let listen_addr = optional("DYNDNS_LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let listen_addr: SocketAddr = listen_addr
            .parse()
            .with_context(|| format!("DYNDNS_LISTEN_ADDR '{listen_addr}' is not a socket address"))?;

        let status_mapping = match optional("DYNDNS_STATUS_MAPPING") {
            Some(value) => value
                .parse()
                .context("DYNDNS_STATUS_MAPPING is not valid")?,
            None => StatusMapping::default(),
        };

        let ttl = match optional("DYNDNS_TTL") {
            Some(value) => value
                .trim()
                .parse()
                .with_context(|| format!("DYNDNS_TTL '{value}' is not a number"))?,
            None => 180,
        };

        let provider_timeout_secs = match optional("DYNDNS_PROVIDER_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse()
                .with_context(|| format!("DYNDNS_PROVIDER_TIMEOUT_SECS '{value}' is not a number"))?,
            None => 10,
        };

        Ok(Self {
            zone_id: required("ROUTE_53_ZONE_ID")?,
            hostname: required("SET_HOSTNAME")?,
            shared_secret: Secret::new(required("SHARED_SECRET")?),
            access_key_id: required("AWS_ACCESS_KEY_ID")?,
            secret_access_key: Secret::new(required("AWS_SECRET_ACCESS_KEY")?),
            session_token: optional("AWS_SESSION_TOKEN").map(Secret::new),
            route53_endpoint: optional("DYNDNS_ROUTE53_ENDPOINT"),
            dry_run,
            listen_addr,
            path: optional("DYNDNS_PATH").unwrap_or_else(|| "/".to_string()),
            source_ip_header: optional("DYNDNS_SOURCE_IP_HEADER"),
            status_mapping,
            ttl,
            provider_timeout_secs,
            run_mode,
            log_level: optional("DYNDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// This performs:
    /// - Hostname format validation
    /// - Placeholder detection for secrets
    /// - Numeric range validation
    /// - Path, header and log level validation
    /// - The core configuration's own validation
    pub fn validate(&self) -> Result<()> {
        validate_hostname(&self.hostname).context("SET_HOSTNAME is not a valid hostname")?;

        // Check for obvious placeholder secrets (common mistake)
        for (name, value) in [
            ("SHARED_SECRET", self.shared_secret.expose()),
            ("AWS_SECRET_ACCESS_KEY", self.secret_access_key.expose()),
        ] {
            let lower = value.to_lowercase();
            if lower.contains("your_secret") || lower.contains("replace_me") || lower == "changeme" {
                anyhow::bail!(
                    "{} appears to be a placeholder. Use the actual value.",
                    name
                );
            }
        }

        if !(1..=604_800).contains(&self.ttl) {
            anyhow::bail!(
                "DYNDNS_TTL must be between 1 and 604800 seconds. Got: {}",
                self.ttl
            );
        }

        if !(1..=300).contains(&self.provider_timeout_secs) {
            anyhow::bail!(
                "DYNDNS_PROVIDER_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.provider_timeout_secs
            );
        }

        if !self.path.starts_with('/') {
            anyhow::bail!("DYNDNS_PATH must start with '/'. Got: {}", self.path);
        }

        if let Some(ref header) = self.source_ip_header {
            HeaderName::from_bytes(header.as_bytes()).with_context(|| {
                format!("DYNDNS_SOURCE_IP_HEADER '{header}' is not a valid header name")
            })?;
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DYNDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        self.to_dyndns_config()
            .validate()
            .context("Invalid endpoint configuration")?;

        Ok(())
    }

    /// Tracing level for `DYNDNS_LOG_LEVEL`
    pub fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// Build the core configuration
    pub fn to_dyndns_config(&self) -> DynDnsConfig {
        let mut config = DynDnsConfig::new(
            self.zone_id.clone(),
            self.hostname.clone(),
            self.shared_secret.clone(),
            ProviderConfig::Route53 {
                access_key_id: self.access_key_id.clone(),
                secret_access_key: self.secret_access_key.clone(),
                session_token: self.session_token.clone(),
                endpoint: self.route53_endpoint.clone(),
                dry_run: self.dry_run,
            },
        );
        config.reconciler.ttl = self.ttl;
        config.reconciler.provider_timeout_secs = self.provider_timeout_secs;
        config.status_mapping = self.status_mapping;
        config
    }
}
