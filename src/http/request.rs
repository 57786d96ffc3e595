//! Inbound request conversion.
//!
//! # Responsibilities
//! - Capture method, path, query, headers and the buffered body
//! - Enforce the body size limit while buffering
//!
//! # Design Decisions
//! - The snapshot is taken once; filters never see the raw stream
//! - Request ID is already present: the request-id layer runs first

use axum::body::Body;
use axum::http::Request;

use crate::filter::{QueryParams, RequestSnapshot};

/// Buffer an axum request into a pipeline snapshot.
pub async fn snapshot_from_request(
    request: Request<Body>,
    max_body_bytes: usize,
) -> Result<RequestSnapshot, axum::Error> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, max_body_bytes).await?;

    let query_string = parts.uri.query().map(str::to_string);
    let query = query_string
        .as_deref()
        .map(QueryParams::parse)
        .unwrap_or_default();

    Ok(RequestSnapshot {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query_string,
        query,
        headers: parts.headers,
        body,
    })
}
