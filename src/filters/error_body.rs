//! Render faults as JSON error bodies.

use serde::Serialize;

use crate::filter::{Filter, FilterOutcome, GatewayResponse, Phase, RequestContext};

/// Body written for every faulted request.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub error: &'static str,
    pub message: String,
    pub request_id: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    pub notes: &'a [String],
}

/// Error-phase filter mapping the recorded fault to a JSON response.
#[derive(Debug, Clone)]
pub struct ErrorBodyFilter {
    priority: i32,
}

impl ErrorBodyFilter {
    pub fn new(priority: i32) -> Self {
        Self { priority }
    }
}

impl Default for ErrorBodyFilter {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Filter for ErrorBodyFilter {
    fn id(&self) -> &str {
        "error-body"
    }

    fn phase(&self) -> Phase {
        Phase::Error
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn should_run(&self, ctx: &RequestContext) -> Result<bool, crate::filter::FilterError> {
        // Leave responses written by earlier error filters alone.
        Ok(ctx.response().is_none())
    }

    fn run(&self, ctx: &mut RequestContext) -> FilterOutcome {
        let Some(fault) = ctx.fault() else {
            return FilterOutcome::Continue;
        };

        let body = ErrorBody {
            error: fault.kind(),
            message: fault.to_string(),
            request_id: ctx.request_id(),
            notes: ctx.fault_notes(),
        };
        let response = match serde_json::to_value(&body) {
            Ok(value) => GatewayResponse::json(fault.default_status(), &value),
            Err(_) => GatewayResponse::new(fault.default_status()),
        };
        ctx.set_response(response);
        FilterOutcome::Continue
    }
}
