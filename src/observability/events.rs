//! Structured pipeline events and the sink interface.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::filter::{OutcomeKind, Phase};
use crate::pipeline::{Fault, Stage};

/// Something observable that happened while driving a request.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    PhaseStarted {
        request_id: String,
        phase: Phase,
    },
    FilterSkipped {
        request_id: String,
        phase: Phase,
        filter_id: String,
    },
    FilterInvoked {
        request_id: String,
        phase: Phase,
        filter_id: String,
        outcome: OutcomeKind,
    },
    RouteResolved {
        request_id: String,
        filter_id: String,
        upstream: Url,
    },
    DispatchStarted {
        request_id: String,
        upstream: Url,
    },
    FaultRecorded {
        request_id: String,
        stage: Stage,
        fault: Fault,
    },
    FaultAnnotated {
        request_id: String,
        note: String,
    },
    Completed {
        request_id: String,
        status: u16,
        fault: Option<&'static str>,
        elapsed: Duration,
    },
}

impl PipelineEvent {
    pub fn request_id(&self) -> &str {
        match self {
            PipelineEvent::PhaseStarted { request_id, .. }
            | PipelineEvent::FilterSkipped { request_id, .. }
            | PipelineEvent::FilterInvoked { request_id, .. }
            | PipelineEvent::RouteResolved { request_id, .. }
            | PipelineEvent::DispatchStarted { request_id, .. }
            | PipelineEvent::FaultRecorded { request_id, .. }
            | PipelineEvent::FaultAnnotated { request_id, .. }
            | PipelineEvent::Completed { request_id, .. } => request_id,
        }
    }
}

/// Receiver of pipeline events.
///
/// Called synchronously from the request path; implementations should not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &PipelineEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: &PipelineEvent) {}
}

/// Forwards each event to every inner sink, in order.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: &PipelineEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
