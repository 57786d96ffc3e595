//! Upstream dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Route phase → Matched{upstream}
//!     → Dispatcher::dispatch(upstream, snapshot)
//!     → client.rs (hyper-util client, header hygiene, body buffering)
//!     → GatewayResponse or DispatchError
//! ```
//!
//! # Design Decisions
//! - The executor owns deadlines and cancellation; dispatchers just dispatch
//! - Dropping the returned future cancels the upstream call
//! - Upstream 5xx is an error, not a response to post-process

pub mod client;

use futures_util::future::BoxFuture;
use thiserror::Error;
use url::Url;

use crate::filter::{GatewayResponse, RequestSnapshot};
use crate::pipeline::Fault;

pub use client::HttpDispatcher;

/// Errors produced while forwarding a request upstream.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The upstream URL cannot be combined with the request target.
    #[error("invalid upstream `{upstream}`: {reason}")]
    InvalidUpstream { upstream: String, reason: String },

    /// Connection, protocol or body read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The upstream answered with a server error.
    #[error("upstream responded with status {status_code}")]
    Status { status_code: u16 },
}

impl DispatchError {
    pub fn to_fault(&self) -> Fault {
        match self {
            DispatchError::Status { status_code } => Fault::UpstreamError {
                status_code: Some(*status_code),
            },
            DispatchError::InvalidUpstream { .. } | DispatchError::Transport(_) => {
                Fault::UpstreamError { status_code: None }
            }
        }
    }
}

/// Performs the proxied call for a matched request.
pub trait Dispatcher: Send + Sync {
    fn dispatch<'a>(
        &'a self,
        upstream: &'a Url,
        request: &'a RequestSnapshot,
    ) -> BoxFuture<'a, Result<GatewayResponse, DispatchError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_to_fault() {
        assert_eq!(
            DispatchError::Status { status_code: 503 }.to_fault(),
            Fault::UpstreamError { status_code: Some(503) }
        );
        assert_eq!(
            DispatchError::Transport("connection refused".into()).to_fault(),
            Fault::UpstreamError { status_code: None }
        );
    }
}
