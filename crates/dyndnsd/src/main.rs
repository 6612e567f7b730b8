// # dyndnsd - Dynamic DNS update endpoint
//
// This daemon is a THIN integration layer:
// - DO NOT add digest, record or status logic here
// - All reconciliation logic lives in dyndns-core
// - Configuration is via environment variables ONLY
//
// The dyndnsd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering providers
// 4. Serving update requests (HTTP) or answering one proxy event (stdin)
//
// ## Configuration
//
// ### Endpoint
// - `ROUTE_53_ZONE_ID`: Hosted zone holding the record (required)
// - `SET_HOSTNAME`: Hostname whose A record is managed (required)
// - `SHARED_SECRET`: Secret mixed into the request digest (required)
//
// ### Route 53
// - `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`: Signing credentials (required)
// - `AWS_SESSION_TOKEN`: Temporary credential token (optional)
// - `DYNDNS_ROUTE53_ENDPOINT`: API endpoint (default https://route53.amazonaws.com)
// - `DYNDNS_MODE`: `live` or `dry-run` (default live)
//
// ### Listener
// - `DYNDNS_RUN_MODE`: `serve` or `event` (default serve)
// - `DYNDNS_LISTEN_ADDR`: Socket address (default 0.0.0.0:8080)
// - `DYNDNS_PATH`: Update path (default /)
// - `DYNDNS_SOURCE_IP_HEADER`: Header set by a trusted proxy (default: peer address)
// - `DYNDNS_STATUS_MAPPING`: `strict` or `legacy` (default strict)
//
// ### Reconciler
// - `DYNDNS_TTL`: TTL written with the record (default 180)
// - `DYNDNS_PROVIDER_TIMEOUT_SECS`: Bound on each provider call (default 10)
// - `DYNDNS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export ROUTE_53_ZONE_ID=Z02438639VH134V380MR
// export SET_HOSTNAME=home.example.com
// export SHARED_SECRET=...
// export AWS_ACCESS_KEY_ID=...
// export AWS_SECRET_ACCESS_KEY=...
//
// dyndnsd
// curl "http://localhost:8080/?hash=$(printf '%s%s%s' "$IP" home.example.com. "$SECRET" | sha256sum | cut -d' ' -f1)"
// ```

mod config;
mod event;
mod server;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use config::{Config, RunMode};
use dyndns_core::{ProviderRegistry, Reconciler};
use server::AppState;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Time allowed for in-flight requests after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DynDnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DynDnsExitCode> for ExitCode {
    fn from(code: DynDnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DynDnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DynDnsExitCode::ConfigError.into();
    }

    // Event mode owns stdout, so logs go to stderr in every mode
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DynDnsExitCode::ConfigError.into();
    }

    info!("Starting dyndnsd");
    info!(
        "Managing A record {} in zone {}",
        config.hostname, config.zone_id
    );

    let reconciler = match build_reconciler(&config) {
        Ok(reconciler) => reconciler,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return DynDnsExitCode::ConfigError.into();
        }
    };

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DynDnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let outcome = match config.run_mode {
            RunMode::Serve => run_server(&config, reconciler).await,
            RunMode::Event => event::run(&reconciler, tokio::io::stdin(), tokio::io::stdout()).await,
        };

        if let Err(e) = outcome {
            error!("Daemon error: {:#}", e);
            DynDnsExitCode::RuntimeError
        } else {
            DynDnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Register providers and build the reconciler
fn build_reconciler(config: &Config) -> Result<Reconciler> {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "route53")]
    {
        info!("Registering Route 53 provider");
        dyndns_provider_route53::register(&registry);
    }

    let dyndns_config = config.to_dyndns_config();
    let provider = registry.create_provider(&dyndns_config.provider)?;

    if config.dry_run {
        warn!("Dry-run mode: record changes are logged, not submitted");
    }

    Ok(Reconciler::new(dyndns_config, provider)?)
}

/// Serve until SIGTERM/SIGINT, then drain
async fn run_server(config: &Config, reconciler: Reconciler) -> Result<()> {
    let state = Arc::new(AppState::new(
        reconciler,
        config.path.clone(),
        config.source_ip_header.as_deref(),
    )?);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(server::serve(config.listen_addr, state, async {
        let _ = stop_rx.await;
    }));

    tokio::select! {
        // Server stopped on its own (bind failure, listener error)
        joined = &mut server => return joined?,
        signal = wait_for_shutdown() => {
            let signal = signal?;
            info!("Received shutdown signal: {}", signal);
        }
    }

    info!("Shutting down, draining in-flight requests");
    let _ = stop_tx.send(());

    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(joined) => joined?,
        Err(_) => Err(anyhow::anyhow!(
            "Shutdown timeout after {:?}",
            SHUTDOWN_GRACE
        )),
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
