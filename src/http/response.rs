//! Outbound response conversion.
//!
//! # Design Decisions
//! - The pipeline always produces a complete, buffered response
//! - Faults are rendered by the pipeline; this layer never maps errors

use axum::body::Body;
use axum::response::{IntoResponse, Response};

use crate::filter::GatewayResponse;

impl IntoResponse for GatewayResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue, StatusCode};

    #[tokio::test]
    async fn test_into_response() {
        let mut gateway = GatewayResponse::new(StatusCode::NOT_FOUND).with_body("missing");
        gateway
            .headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        let response = gateway.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/plain");

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(body, "missing");
    }
}
