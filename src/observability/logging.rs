//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Render pipeline events as structured log records
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level
//! - Per-filter chatter is debug; faults are warn; completions are info

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::observability::events::{EventSink, PipelineEvent};

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: &ObservabilityConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("filter_gateway={},tower_http={}", config.log_level, config.log_level).into()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

/// Renders pipeline events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::PhaseStarted { request_id, phase } => {
                tracing::trace!(request_id = %request_id, phase = %phase, "Phase started");
            }
            PipelineEvent::FilterSkipped { request_id, phase, filter_id } => {
                tracing::trace!(request_id = %request_id, phase = %phase, filter = %filter_id, "Filter skipped");
            }
            PipelineEvent::FilterInvoked { request_id, phase, filter_id, outcome } => {
                tracing::debug!(
                    request_id = %request_id,
                    phase = %phase,
                    filter = %filter_id,
                    outcome = outcome.as_str(),
                    "Filter invoked"
                );
            }
            PipelineEvent::RouteResolved { request_id, filter_id, upstream } => {
                tracing::debug!(request_id = %request_id, filter = %filter_id, upstream = %upstream, "Route resolved");
            }
            PipelineEvent::DispatchStarted { request_id, upstream } => {
                tracing::debug!(request_id = %request_id, upstream = %upstream, "Dispatching upstream");
            }
            PipelineEvent::FaultRecorded { request_id, stage, fault } => {
                tracing::warn!(
                    request_id = %request_id,
                    stage = %stage,
                    kind = fault.kind(),
                    error = %fault,
                    "Fault recorded"
                );
            }
            PipelineEvent::FaultAnnotated { request_id, note } => {
                tracing::warn!(request_id = %request_id, note = %note, "Fault annotated");
            }
            PipelineEvent::Completed { request_id, status, fault, elapsed } => {
                tracing::info!(
                    request_id = %request_id,
                    status = status,
                    fault = fault.unwrap_or("none"),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Request completed"
                );
            }
        }
    }
}
