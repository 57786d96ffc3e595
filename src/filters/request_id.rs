//! Echo the request id on the outgoing response.

use axum::http::{HeaderName, HeaderValue};

use crate::filter::{Filter, FilterOutcome, Phase, RequestContext};
use crate::pipeline::REQUEST_ID_HEADER;

/// Post-phase filter that stamps `x-request-id` on the response.
#[derive(Debug, Clone)]
pub struct RequestIdFilter {
    priority: i32,
}

impl RequestIdFilter {
    pub fn new(priority: i32) -> Self {
        Self { priority }
    }
}

impl Default for RequestIdFilter {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Filter for RequestIdFilter {
    fn id(&self) -> &str {
        "request-id"
    }

    fn phase(&self) -> Phase {
        Phase::Post
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn should_run(&self, ctx: &RequestContext) -> Result<bool, crate::filter::FilterError> {
        Ok(ctx.response().is_some())
    }

    fn run(&self, ctx: &mut RequestContext) -> FilterOutcome {
        let value = match HeaderValue::from_str(ctx.request_id()) {
            Ok(v) => v,
            Err(_) => return FilterOutcome::Continue,
        };
        if let Some(response) = ctx.response_mut() {
            response
                .headers
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
        FilterOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{GatewayResponse, RequestSnapshot};
    use axum::http::{Method, StatusCode};

    #[test]
    fn test_stamps_header_when_response_present() {
        let filter = RequestIdFilter::default();
        let mut ctx = RequestContext::new("req-42", RequestSnapshot::new(Method::GET, "/"));
        assert!(!filter.should_run(&ctx).unwrap());

        ctx.set_response(GatewayResponse::new(StatusCode::OK));
        assert!(filter.should_run(&ctx).unwrap());
        assert_eq!(filter.run(&mut ctx), FilterOutcome::Continue);
        assert_eq!(
            ctx.response().unwrap().headers.get(REQUEST_ID_HEADER).unwrap(),
            "req-42"
        );
    }
}
