//! Fault taxonomy and default status mapping.

use axum::http::StatusCode;
use thiserror::Error;

/// Why a request could not complete normally.
///
/// Every fault is captured into the request context and routes the request
/// through the error phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// No route filter produced a matched decision.
    #[error("no route matched the request")]
    NoRouteMatched,

    /// A filter errored or panicked instead of returning an outcome.
    #[error("filter `{filter_id}` faulted: {cause}")]
    FilterPanicked { filter_id: String, cause: String },

    /// Dispatch exceeded the per-request deadline.
    #[error("upstream did not respond within {timeout_ms} ms")]
    UpstreamTimeout { timeout_ms: u64 },

    /// The client went away while dispatch was in flight.
    #[error("client disconnected before the upstream responded")]
    ClientDisconnected,

    /// The upstream failed or answered with a server error.
    #[error("upstream request failed{}", describe_status(.status_code))]
    UpstreamError { status_code: Option<u16> },

    /// A filter refused the request.
    #[error("request rejected ({status}): {reason}")]
    Rejected { status: u16, reason: String },
}

fn describe_status(status_code: &Option<u16>) -> String {
    match status_code {
        Some(code) => format!(" with status {}", code),
        None => String::new(),
    }
}

/// Nginx's "client closed request"; never reaches the client.
const CLIENT_CLOSED_REQUEST: u16 = 499;

impl Fault {
    /// Status used when no error filter renders a response.
    pub fn default_status(&self) -> StatusCode {
        match self {
            Fault::NoRouteMatched => StatusCode::NOT_FOUND,
            Fault::FilterPanicked { .. } | Fault::UpstreamError { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Fault::UpstreamTimeout { .. } => StatusCode::BAD_GATEWAY,
            Fault::ClientDisconnected => StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                .unwrap_or(StatusCode::BAD_REQUEST),
            // Only error statuses; a rejection never renders as success.
            Fault::Rejected { status, .. } => match StatusCode::from_u16(*status) {
                Ok(code) if code.is_client_error() || code.is_server_error() => code,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Stable machine-readable name, used in metrics labels and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Fault::NoRouteMatched => "no_route_matched",
            Fault::FilterPanicked { .. } => "filter_panicked",
            Fault::UpstreamTimeout { .. } => "upstream_timeout",
            Fault::ClientDisconnected => "client_disconnected",
            Fault::UpstreamError { .. } => "upstream_error",
            Fault::Rejected { .. } => "rejected",
        }
    }
}
