//! HTTP dispatcher backed by the hyper-util client.
//!
//! # Responsibilities
//! - Join the upstream base URL with the request path and query
//! - Forward end-to-end headers and the buffered request body
//! - Buffer the upstream response up to the configured limit

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, Request, Uri};
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::dispatch::{DispatchError, Dispatcher};
use crate::filter::{GatewayResponse, RequestSnapshot};

/// Headers that describe a single hop and must not be forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Forwards matched requests to plain-HTTP upstreams.
#[derive(Clone)]
pub struct HttpDispatcher {
    client: Client<HttpConnector, Body>,
    max_body_bytes: usize,
}

impl HttpDispatcher {
    pub fn new(connect_timeout: Duration, max_body_bytes: usize) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            max_body_bytes,
        }
    }

    fn build_request(upstream: &Url, request: &RequestSnapshot) -> Result<Request<Body>, DispatchError> {
        let base = upstream.as_str().trim_end_matches('/');
        let target = format!("{}{}", base, request.path_and_query());
        let uri: Uri = target.parse().map_err(|e: axum::http::uri::InvalidUri| {
            DispatchError::InvalidUpstream {
                upstream: upstream.to_string(),
                reason: e.to_string(),
            }
        })?;

        let mut builder = Request::builder().method(request.method.clone()).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            copy_end_to_end(&request.headers, headers);
            // The client derives Host from the upstream authority.
            headers.remove(header::HOST);
            headers.remove(header::CONTENT_LENGTH);
        }

        builder
            .body(Body::from(request.body.clone()))
            .map_err(|e| DispatchError::InvalidUpstream {
                upstream: upstream.to_string(),
                reason: e.to_string(),
            })
    }
}

impl Dispatcher for HttpDispatcher {
    fn dispatch<'a>(
        &'a self,
        upstream: &'a Url,
        request: &'a RequestSnapshot,
    ) -> BoxFuture<'a, Result<GatewayResponse, DispatchError>> {
        Box::pin(async move {
            let outbound = Self::build_request(upstream, request)?;

            let response = self
                .client
                .request(outbound)
                .await
                .map_err(|e| DispatchError::Transport(e.to_string()))?;

            let status = response.status();
            if status.is_server_error() {
                return Err(DispatchError::Status {
                    status_code: status.as_u16(),
                });
            }

            let (parts, body) = response.into_parts();
            let body = axum::body::to_bytes(Body::new(body), self.max_body_bytes)
                .await
                .map_err(|e| DispatchError::Transport(e.to_string()))?;

            let mut headers = HeaderMap::new();
            copy_end_to_end(&parts.headers, &mut headers);

            Ok(GatewayResponse {
                status,
                headers,
                body,
            })
        })
    }
}

fn copy_end_to_end(from: &HeaderMap, to: &mut HeaderMap) {
    for (name, value) in from.iter() {
        if !HOP_BY_HOP.contains(name) {
            to.append(name.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Method};

    #[test]
    fn test_build_request_joins_upstream_and_target() {
        let upstream = Url::parse("http://127.0.0.1:9000/base/").unwrap();
        let snapshot = RequestSnapshot::new(Method::POST, "/items?country=india")
            .with_header(header::HOST, HeaderValue::from_static("gateway.local"))
            .with_header(header::CONNECTION, HeaderValue::from_static("keep-alive"))
            .with_header(header::ACCEPT, HeaderValue::from_static("application/json"))
            .with_body("payload");

        let request = HttpDispatcher::build_request(&upstream, &snapshot).unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.uri().to_string(), "http://127.0.0.1:9000/base/items?country=india");
        assert!(request.headers().get(header::HOST).is_none());
        assert!(request.headers().get(header::CONNECTION).is_none());
        assert_eq!(request.headers().get(header::ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn test_copy_end_to_end_drops_hop_headers() {
        let mut from = HeaderMap::new();
        from.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        from.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let mut to = HeaderMap::new();

        copy_end_to_end(&from, &mut to);

        assert_eq!(to.len(), 1);
        assert!(to.contains_key(header::CONTENT_TYPE));
    }
}
