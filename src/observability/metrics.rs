//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_filter_invocations_total` (counter): by phase, filter, outcome
//! - `gateway_faults_total` (counter): by stage, kind
//! - `gateway_requests_total` (counter): by status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; no-ops until a recorder is installed
//! - Prometheus exporter is optional and configured at startup

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::observability::events::{EventSink, PipelineEvent};

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Translates pipeline events into metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsSink;

impl EventSink for MetricsSink {
    fn emit(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::FilterInvoked { phase, filter_id, outcome, .. } => {
                counter!(
                    "gateway_filter_invocations_total",
                    "phase" => phase.as_str(),
                    "filter" => filter_id.clone(),
                    "outcome" => outcome.as_str()
                )
                .increment(1);
            }
            PipelineEvent::FaultRecorded { stage, fault, .. } => {
                counter!(
                    "gateway_faults_total",
                    "stage" => stage.as_str(),
                    "kind" => fault.kind()
                )
                .increment(1);
            }
            PipelineEvent::Completed { status, elapsed, .. } => {
                counter!("gateway_requests_total", "status" => status.to_string()).increment(1);
                histogram!("gateway_request_duration_seconds").record(elapsed.as_secs_f64());
            }
            _ => {}
        }
    }
}
