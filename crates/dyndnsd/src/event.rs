//! One-shot proxy event mode
//!
//! Reads a single API-gateway proxy event from the input, runs one
//! reconciliation and writes the proxy response envelope to the output.

use anyhow::{Context, Result};
use dyndns_core::gateway::{ProxyEvent, ProxyResponse};
use dyndns_core::{Reconciler, ReturnStatus, UpdateResponse};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, warn};

/// Process the event read from `input`, write the response to `output`
pub async fn run<R, W>(reconciler: &Reconciler, mut input: R, mut output: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut event = String::new();
    input
        .read_to_string(&mut event)
        .await
        .context("Failed to read proxy event")?;

    let response = handle_event(&event, reconciler).await;
    let json = serde_json::to_string(&response).context("Failed to encode proxy response")?;

    output.write_all(json.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}

/// Turn one event document into a response envelope
pub async fn handle_event(event: &str, reconciler: &Reconciler) -> ProxyResponse {
    let event = match ProxyEvent::from_json(event) {
        Ok(event) => event,
        Err(e) => {
            error!("Unreadable proxy event: {}", e);
            return ProxyResponse::from(&UpdateResponse::internal_error());
        }
    };

    if !event.is_get() {
        warn!("Rejecting {:?} event", event.http_method);
        return ProxyResponse::from(&UpdateResponse::new(
            405,
            ReturnStatus::Fail,
            "method not allowed",
        ));
    }

    let request = event.to_update_request();
    let mapping = reconciler.config().status_mapping;

    match AssertUnwindSafe(reconciler.reconcile(&request)).catch_unwind().await {
        Ok(result) => ProxyResponse::from(&UpdateResponse::from_result(&result, mapping)),
        Err(_) => {
            error!("Reconciliation panicked");
            ProxyResponse::from(&UpdateResponse::internal_error())
        }
    }
}
