//! Route handlers.

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use edgesub_core::{aggregate, render, Credential, Endpoint};
use edgesub_sources::ProbeResult;
use tracing::{debug, info};

use crate::error::{ApiError, Result};
use crate::models::{
    probe_timeout, BatchProbeRequest, BatchProbeResponse, ProbeQuery, SubscriptionQuery,
};
use crate::state::AppState;

/// Cache policy attached to every subscription payload.
pub const NO_STORE: &str = "no-store, no-cache, must-revalidate, max-age=0";

/// Maps a `Host` header value to the native endpoint.
///
/// A port in the header becomes the endpoint's explicit port.
pub fn native_endpoint(host: &str) -> Option<Endpoint> {
    let host = host.trim();
    if host.is_empty() {
        return None;
    }

    let (name, port) = if let Some(rest) = host.strip_prefix('[') {
        let (addr, tail) = rest.split_once(']')?;
        (addr, tail.strip_prefix(':'))
    } else {
        match host.rsplit_once(':') {
            Some((name, port)) if !name.contains(':') => (name, Some(port)),
            _ => (host, None),
        }
    };
    if name.is_empty() {
        return None;
    }

    let endpoint = Endpoint::new(name);
    Some(match port.and_then(|p| p.parse::<u16>().ok()) {
        Some(port) => endpoint.with_port(port),
        None => endpoint,
    })
}

/// GET /{credential}/sub - Aggregate and render a subscription.
pub async fn subscription(
    State(state): State<AppState>,
    Path(credential): Path<String>,
    Query(query): Query<SubscriptionQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    let started = Instant::now();
    let credential = Credential::parse(&credential)?;

    let native = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .and_then(native_endpoint)
        .ok_or_else(|| ApiError::BadRequest("missing Host header".to_string()))?;
    let request = query.to_request(credential, native)?;
    let render_target = query.render_target();

    debug!(
        native = %request.native.address,
        sources = ?request.sources,
        protocols = ?request.protocols,
        "Aggregating subscription"
    );

    let links = aggregate(&request, &state.sources).await;
    let rendered = render(&links, render_target)?;

    info!(
        render_target = %render_target,
        links = links.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Subscription served"
    );

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(rendered.content_type)),
            (header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE)),
        ],
        rendered.body,
    )
        .into_response())
}

/// GET /test - Probe one host.
pub async fn probe_one(
    State(state): State<AppState>,
    Query(query): Query<ProbeQuery>,
) -> Result<Json<ProbeResult>> {
    let host = query
        .host
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing host parameter".to_string()))?;

    let result = state
        .prober
        .probe(host, query.port, probe_timeout(query.timeout))
        .await;
    Ok(Json(result))
}

/// POST /batch-test - Probe many hosts with bounded concurrency.
pub async fn probe_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchProbeRequest>,
) -> Result<Json<BatchProbeResponse>> {
    let hosts: Vec<String> = req
        .hosts
        .iter()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .collect();
    if hosts.is_empty() {
        return Err(ApiError::BadRequest("hosts must be a non-empty array".to_string()));
    }

    let results = state
        .prober
        .probe_many(&hosts, req.port, probe_timeout(req.timeout), req.concurrency)
        .await;
    Ok(Json(BatchProbeResponse::from(results)))
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("no such route".to_string())
}
