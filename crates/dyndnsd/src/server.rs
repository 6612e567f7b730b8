//! HTTP listener
//!
//! Routes:
//! - `GET {path}?hash=<digest>` runs one reconciliation
//! - `GET /health` answers `{"status":"ok"}` without touching the provider
//! - any other method on `{path}` is 405, anything else 404
//!
//! Every body is JSON. A panic while handling a request is turned into the
//! opaque 500 response instead of tearing down the connection.

use anyhow::{Context, Result};
use dyndns_core::gateway::HASH_PARAM;
use dyndns_core::response::CONTENT_TYPE_JSON;
use dyndns_core::{Reconciler, ReturnStatus, UpdateRequest, UpdateResponse};
use futures::FutureExt;
use hyper::header::{HeaderName, HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Path of the liveness probe
pub const HEALTH_PATH: &str = "/health";

/// Shared state handed to every connection
pub struct AppState {
    reconciler: Reconciler,
    path: String,
    source_ip_header: Option<HeaderName>,
}

impl AppState {
    /// Create the state
    ///
    /// `source_ip_header` names a header set by a trusted proxy; its first
    /// comma-separated entry is used as the caller's address. Without it the
    /// TCP peer address is used.
    pub fn new(
        reconciler: Reconciler,
        path: impl Into<String>,
        source_ip_header: Option<&str>,
    ) -> Result<Self> {
        let source_ip_header = source_ip_header
            .map(|name| {
                HeaderName::from_bytes(name.as_bytes())
                    .with_context(|| format!("Invalid source IP header name: {name}"))
            })
            .transpose()?;

        Ok(Self {
            reconciler,
            path: path.into(),
            source_ip_header,
        })
    }

    /// Address the update is for
    fn source_ip(&self, req: &Request<Body>, peer_ip: IpAddr) -> String {
        self.source_ip_header
            .as_ref()
            .and_then(|name| req.headers().get(name))
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| unmapped(peer_ip).to_string())
    }
}

/// Serve until `shutdown` resolves, then drain in-flight requests
pub async fn serve<F>(addr: SocketAddr, state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let path = state.path.clone();

    let make_svc = make_service_fn(move |conn: &AddrStream| {
        let state = Arc::clone(&state);
        let peer_ip = conn.remote_addr().ip();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                let state = Arc::clone(&state);
                async move { Ok::<_, Infallible>(handle_request(req, &state, peer_ip).await) }
            }))
        }
    });

    let server = Server::try_bind(&addr)
        .with_context(|| format!("Failed to bind {addr}"))?
        .serve(make_svc);

    info!("Listening on http://{}{}", server.local_addr(), path);

    server
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")
}

/// Handle one request; never fails
pub async fn handle_request(req: Request<Body>, state: &AppState, peer_ip: IpAddr) -> Response<Body> {
    match AssertUnwindSafe(route(req, state, peer_ip)).catch_unwind().await {
        Ok(response) => response,
        Err(_) => {
            error!("Request handler panicked");
            update_response(&UpdateResponse::internal_error())
        }
    }
}

async fn route(req: Request<Body>, state: &AppState, peer_ip: IpAddr) -> Response<Body> {
    let path = req.uri().path();
    debug!("{} {} from {}", req.method(), path, peer_ip);

    if path == state.path {
        if req.method() != Method::GET {
            let mut response = update_response(&UpdateResponse::new(
                405,
                ReturnStatus::Fail,
                "method not allowed",
            ));
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static("GET"));
            return response;
        }

        let source_ip = state.source_ip(&req, peer_ip);
        let digest = query_param(req.uri().query(), HASH_PARAM).unwrap_or_default();
        let request = UpdateRequest::new(source_ip, digest);

        let result = state.reconciler.reconcile(&request).await;
        let mapping = state.reconciler.config().status_mapping;
        return update_response(&UpdateResponse::from_result(&result, mapping));
    }

    if path == HEALTH_PATH && req.method() == Method::GET {
        return json_response(StatusCode::OK, r#"{"status":"ok"}"#.to_string());
    }

    update_response(&UpdateResponse::new(404, ReturnStatus::Fail, "not found"))
}

fn update_response(response: &UpdateResponse) -> Response<Body> {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    json_response(status, response.body_json())
}

fn json_response(status: StatusCode, body: String) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
    response
}

/// First value of `name` in a form-urlencoded query string
fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// IPv4 peers on a dual-stack socket show up as `::ffff:a.b.c.d`
fn unmapped(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        ip => ip,
    }
}
