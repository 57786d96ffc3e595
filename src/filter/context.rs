//! Per-request state threaded through the pipeline.
//!
//! # Responsibilities
//! - Hold the inbound request snapshot (read-only to filters)
//! - Hold the route target, response-in-progress and fault slots
//! - Provide typed scratch storage for inter-filter state
//!
//! # Design Decisions
//! - One context per request; never shared between requests
//! - Fault slot is last-write-wins and cannot be cleared by filters
//! - Query parameters keep every value in arrival order

use std::any::Any;
use std::collections::HashMap;
use std::time::Instant;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use url::Url;

use crate::pipeline::Fault;
use crate::routing::RoutingDecision;

/// Query parameters; a name may repeat, so values are kept as ordered lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: HashMap<String, Vec<String>>,
}

impl QueryParams {
    /// Parse a raw (percent-encoded) query string.
    pub fn parse(raw: &str) -> Self {
        let mut params: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            params.entry(key.into_owned()).or_default().push(value.into_owned());
        }
        Self { params }
    }

    /// First value of a parameter, if present.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of a parameter in arrival order.
    pub fn all(&self, name: &str) -> &[String] {
        self.params.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Immutable snapshot of the inbound request.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    pub method: Method,
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query_string: Option<String>,
    pub query: QueryParams,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RequestSnapshot {
    /// Build a snapshot from a method and a request target (`/path?query`).
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query_string) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };
        let query = query_string
            .as_deref()
            .map(QueryParams::parse)
            .unwrap_or_default();
        let path = if path.is_empty() { "/" } else { path };

        Self {
            method,
            path: path.to_string(),
            query_string,
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Host header value, if present and valid UTF-8.
    pub fn host(&self) -> Option<&str> {
        self.headers.get(header::HOST).and_then(|h| h.to_str().ok())
    }

    /// Path plus query string, as sent on the wire.
    pub fn path_and_query(&self) -> String {
        match &self.query_string {
            Some(q) if !q.is_empty() => format!("{}?{}", self.path, q),
            _ => self.path.clone(),
        }
    }
}

/// Response being assembled for the client.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl GatewayResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// JSON response with the matching content type.
    pub fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        let mut response = Self::new(status).with_body(value.to_string());
        response.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}

/// Mutable per-request state handed to every filter.
pub struct RequestContext {
    request_id: String,
    request: RequestSnapshot,
    route: Option<RoutingDecision>,
    response: Option<GatewayResponse>,
    fault: Option<Fault>,
    fault_notes: Vec<String>,
    scratch: HashMap<String, Box<dyn Any + Send + Sync>>,
    started_at: Instant,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, request: RequestSnapshot) -> Self {
        Self {
            request_id: request_id.into(),
            request,
            route: None,
            response: None,
            fault: None,
            fault_notes: Vec::new(),
            scratch: HashMap::new(),
            started_at: Instant::now(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn request(&self) -> &RequestSnapshot {
        &self.request
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    // --- Route slot ---

    pub fn route(&self) -> Option<&RoutingDecision> {
        self.route.as_ref()
    }

    pub fn set_route(&mut self, decision: RoutingDecision) {
        self.route = Some(decision);
    }

    /// Upstream of a matched route, if any.
    pub fn upstream(&self) -> Option<&Url> {
        self.route.as_ref().and_then(RoutingDecision::upstream)
    }

    pub(crate) fn clear_route(&mut self) {
        self.route = None;
    }

    // --- Response slot ---

    pub fn response(&self) -> Option<&GatewayResponse> {
        self.response.as_ref()
    }

    pub fn response_mut(&mut self) -> Option<&mut GatewayResponse> {
        self.response.as_mut()
    }

    pub fn set_response(&mut self, response: GatewayResponse) {
        self.response = Some(response);
    }

    pub(crate) fn clear_response(&mut self) {
        self.response = None;
    }

    pub(crate) fn take_response(&mut self) -> Option<GatewayResponse> {
        self.response.take()
    }

    // --- Fault slot ---

    /// Record a fault. A later call replaces the earlier fault.
    pub fn set_fault(&mut self, fault: Fault) {
        self.fault = Some(fault);
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    pub fn has_fault(&self) -> bool {
        self.fault.is_some()
    }

    /// Attach a note to the recorded fault. Ignored when no fault is set.
    pub fn annotate_fault(&mut self, note: impl Into<String>) -> bool {
        if self.fault.is_none() {
            return false;
        }
        self.fault_notes.push(note.into());
        true
    }

    pub fn fault_notes(&self) -> &[String] {
        &self.fault_notes
    }

    // --- Scratch state ---

    /// Typed lookup; returns `None` if the key is missing or holds another type.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.scratch.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.scratch.get_mut(key).and_then(|v| v.downcast_mut::<T>())
    }

    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.scratch.insert(key.into(), Box::new(value));
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.scratch.remove(key).is_some()
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("method", &self.request.method)
            .field("path", &self.request.path)
            .field("route", &self.route)
            .field("fault", &self.fault)
            .field("scratch_keys", &self.scratch.keys().collect::<Vec<_>>())
            .finish()
    }
}
