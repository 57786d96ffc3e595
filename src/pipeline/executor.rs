//! The state machine driving one request to completion.
//!
//! # States
//! ```text
//! Pre → Route → Dispatch → Post → Done
//!  │      │        │        │
//!  └──────┴────────┴────────┴──→ Error → Done
//! ```
//!
//! # Design Decisions
//! - Filters run sequentially in registry order; one snapshot per phase
//! - Route phase is first-match-wins; pre/post/error run every eligible filter
//! - Any fault in the context forces the error phase, even after a short-circuit
//! - Filter errors and panics are contained and become `FilterPanicked`
//! - The caller always gets a response; no fault escapes un-rendered

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use uuid::Uuid;

use crate::dispatch::Dispatcher;
use crate::filter::{
    Filter, FilterOutcome, FilterRegistry, GatewayResponse, OutcomeKind, Phase, RequestContext,
    RequestSnapshot,
};
use crate::observability::{EventSink, NoopSink, PipelineEvent};
use crate::pipeline::Fault;
use crate::resilience::{race_dispatch, DispatchRace};
use crate::routing::RoutingDecision;

/// Request header consulted for an inbound request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Default per-request dispatch deadline.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Position of a request in the pipeline state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pre,
    Route,
    Dispatch,
    Post,
    Error,
    Done,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Pre => "pre",
            Stage::Route => "route",
            Stage::Dispatch => "dispatch",
            Stage::Post => "post",
            Stage::Error => "error",
            Stage::Done => "done",
        }
    }
}

impl From<Phase> for Stage {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Pre => Stage::Pre,
            Phase::Route => Stage::Route,
            Phase::Post => Stage::Post,
            Phase::Error => Stage::Error,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of one pipeline run.
#[derive(Debug)]
pub struct Completion {
    pub response: GatewayResponse,
    pub context: RequestContext,
}

impl Completion {
    pub fn status(&self) -> StatusCode {
        self.response.status
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.context.fault()
    }

    pub fn route(&self) -> Option<&RoutingDecision> {
        self.context.route()
    }
}

/// How a non-error phase ended.
enum PhaseExit {
    Completed,
    Matched,
    ShortCircuit,
    Failed,
}

/// What happened when a single filter was offered the request.
enum Invocation {
    Skipped,
    Ran(FilterOutcome),
    Faulted(Fault),
}

/// Drives requests through the registered filter chain.
pub struct PipelineExecutor {
    registry: Arc<FilterRegistry>,
    dispatcher: Arc<dyn Dispatcher>,
    events: Arc<dyn EventSink>,
    dispatch_timeout: Duration,
}

impl PipelineExecutor {
    pub fn new(registry: Arc<FilterRegistry>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            registry,
            dispatcher,
            events: Arc::new(NoopSink),
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<FilterRegistry> {
        &self.registry
    }

    pub fn dispatch_timeout(&self) -> Duration {
        self.dispatch_timeout
    }

    /// Run a request with no disconnect signal.
    pub async fn execute(&self, request: RequestSnapshot) -> Completion {
        self.execute_with_disconnect(request, std::future::pending()).await
    }

    /// Run a request; `disconnect` resolving during dispatch aborts it with
    /// `ClientDisconnected`.
    pub async fn execute_with_disconnect<D>(&self, request: RequestSnapshot, disconnect: D) -> Completion
    where
        D: Future<Output = ()>,
    {
        let request_id = request
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        self.run(RequestContext::new(request_id, request), disconnect).await
    }

    /// Drive an already-built context through the state machine.
    pub async fn run<D>(&self, mut ctx: RequestContext, disconnect: D) -> Completion
    where
        D: Future<Output = ()>,
    {
        tokio::pin!(disconnect);

        let mut stage = Stage::Pre;
        loop {
            stage = match stage {
                Stage::Pre => match self.run_phase(Phase::Pre, &mut ctx) {
                    PhaseExit::Completed | PhaseExit::Matched => Stage::Route,
                    PhaseExit::ShortCircuit => Stage::Done,
                    PhaseExit::Failed => Stage::Error,
                },
                Stage::Route => {
                    ctx.clear_route();
                    match self.run_phase(Phase::Route, &mut ctx) {
                        PhaseExit::Matched => Stage::Dispatch,
                        PhaseExit::ShortCircuit if ctx.response().is_some() => Stage::Done,
                        PhaseExit::Failed => Stage::Error,
                        // Stopping the route phase without an answer is still a miss.
                        PhaseExit::ShortCircuit | PhaseExit::Completed => {
                            self.record_fault(&mut ctx, Stage::Route, Fault::NoRouteMatched);
                            Stage::Error
                        }
                    }
                }
                Stage::Dispatch => self.dispatch(&mut ctx, disconnect.as_mut()).await,
                Stage::Post => match self.run_phase(Phase::Post, &mut ctx) {
                    PhaseExit::Failed => Stage::Error,
                    _ => Stage::Done,
                },
                Stage::Error => {
                    self.run_error_phase(&mut ctx);
                    Stage::Done
                }
                Stage::Done => break,
            };
        }

        self.complete(ctx)
    }

    fn run_phase(&self, phase: Phase, ctx: &mut RequestContext) -> PhaseExit {
        self.emit(PipelineEvent::PhaseStarted {
            request_id: ctx.request_id().to_string(),
            phase,
        });

        let filters = self.registry.filters_for(phase);
        for filter in filters.iter() {
            match self.invoke(phase, filter, ctx) {
                Invocation::Skipped => continue,
                Invocation::Faulted(fault) | Invocation::Ran(FilterOutcome::Fail(fault)) => {
                    self.record_fault(ctx, phase.into(), fault);
                    return PhaseExit::Failed;
                }
                Invocation::Ran(outcome) => {
                    if let Some(fault) = ctx.fault().cloned() {
                        // Written through set_fault; already in the slot.
                        self.emit(PipelineEvent::FaultRecorded {
                            request_id: ctx.request_id().to_string(),
                            stage: phase.into(),
                            fault,
                        });
                        return PhaseExit::Failed;
                    }
                    if outcome == FilterOutcome::ShortCircuit {
                        return PhaseExit::ShortCircuit;
                    }
                }
            }

            if phase == Phase::Route {
                if let Some(upstream) = ctx.upstream().cloned() {
                    self.emit(PipelineEvent::RouteResolved {
                        request_id: ctx.request_id().to_string(),
                        filter_id: filter.id().to_string(),
                        upstream,
                    });
                    return PhaseExit::Matched;
                }
            }
        }

        PhaseExit::Completed
    }

    fn run_error_phase(&self, ctx: &mut RequestContext) {
        // Error filters own the rendered response from here on.
        ctx.clear_response();
        self.emit(PipelineEvent::PhaseStarted {
            request_id: ctx.request_id().to_string(),
            phase: Phase::Error,
        });

        let filters = self.registry.filters_for(Phase::Error);
        for filter in filters.iter() {
            let note = match self.invoke(Phase::Error, filter, ctx) {
                Invocation::Skipped | Invocation::Ran(FilterOutcome::Continue) => continue,
                Invocation::Ran(FilterOutcome::ShortCircuit) => break,
                Invocation::Ran(FilterOutcome::Fail(fault)) => {
                    format!("error filter `{}` failed: {}", filter.id(), fault)
                }
                Invocation::Faulted(fault) => fault.to_string(),
            };
            self.annotate(ctx, note);
        }
    }

    async fn dispatch<D>(&self, ctx: &mut RequestContext, disconnect: D) -> Stage
    where
        D: Future<Output = ()>,
    {
        let Some(upstream) = ctx.upstream().cloned() else {
            self.record_fault(ctx, Stage::Dispatch, Fault::NoRouteMatched);
            return Stage::Error;
        };

        self.emit(PipelineEvent::DispatchStarted {
            request_id: ctx.request_id().to_string(),
            upstream: upstream.clone(),
        });

        let race = race_dispatch(
            self.dispatcher.dispatch(&upstream, ctx.request()),
            self.dispatch_timeout,
            disconnect,
        )
        .await;

        match race {
            DispatchRace::Completed(Ok(response)) => {
                ctx.set_response(response);
                Stage::Post
            }
            DispatchRace::Completed(Err(err)) => {
                self.record_fault(ctx, Stage::Dispatch, err.to_fault());
                self.annotate(ctx, err.to_string());
                Stage::Error
            }
            DispatchRace::TimedOut => {
                let timeout_ms = self.dispatch_timeout.as_millis() as u64;
                self.record_fault(ctx, Stage::Dispatch, Fault::UpstreamTimeout { timeout_ms });
                Stage::Error
            }
            DispatchRace::Disconnected => {
                self.record_fault(ctx, Stage::Dispatch, Fault::ClientDisconnected);
                Stage::Error
            }
        }
    }

    /// Offer the request to one filter, containing errors and panics.
    fn invoke(&self, phase: Phase, filter: &Arc<dyn Filter>, ctx: &mut RequestContext) -> Invocation {
        let filter_id = filter.id().to_string();

        let eligible = match catch_unwind(AssertUnwindSafe(|| filter.should_run(ctx))) {
            Ok(Ok(eligible)) => eligible,
            Ok(Err(err)) => return self.filter_faulted(ctx, phase, filter_id, err.to_string()),
            Err(payload) => return self.filter_faulted(ctx, phase, filter_id, panic_message(payload)),
        };

        if !eligible {
            self.emit(PipelineEvent::FilterSkipped {
                request_id: ctx.request_id().to_string(),
                phase,
                filter_id,
            });
            return Invocation::Skipped;
        }

        match catch_unwind(AssertUnwindSafe(|| filter.run(ctx))) {
            Ok(outcome) => {
                self.emit(PipelineEvent::FilterInvoked {
                    request_id: ctx.request_id().to_string(),
                    phase,
                    filter_id,
                    outcome: outcome.kind(),
                });
                Invocation::Ran(outcome)
            }
            Err(payload) => self.filter_faulted(ctx, phase, filter_id, panic_message(payload)),
        }
    }

    fn filter_faulted(
        &self,
        ctx: &RequestContext,
        phase: Phase,
        filter_id: String,
        cause: String,
    ) -> Invocation {
        self.emit(PipelineEvent::FilterInvoked {
            request_id: ctx.request_id().to_string(),
            phase,
            filter_id: filter_id.clone(),
            outcome: OutcomeKind::Panicked,
        });
        Invocation::Faulted(Fault::FilterPanicked { filter_id, cause })
    }

    fn record_fault(&self, ctx: &mut RequestContext, stage: Stage, fault: Fault) {
        ctx.set_fault(fault.clone());
        self.emit(PipelineEvent::FaultRecorded {
            request_id: ctx.request_id().to_string(),
            stage,
            fault,
        });
    }

    fn annotate(&self, ctx: &mut RequestContext, note: String) {
        if ctx.annotate_fault(note.clone()) {
            self.emit(PipelineEvent::FaultAnnotated {
                request_id: ctx.request_id().to_string(),
                note,
            });
        }
    }

    fn complete(&self, mut ctx: RequestContext) -> Completion {
        let response = match ctx.take_response() {
            Some(response) => response,
            None => match ctx.fault() {
                Some(fault) => GatewayResponse::new(fault.default_status()),
                None => GatewayResponse::new(StatusCode::OK),
            },
        };

        self.emit(PipelineEvent::Completed {
            request_id: ctx.request_id().to_string(),
            status: response.status.as_u16(),
            fault: ctx.fault().map(Fault::kind),
            elapsed: ctx.started_at().elapsed(),
        });

        Completion {
            response,
            context: ctx,
        }
    }

    fn emit(&self, event: PipelineEvent) {
        self.events.emit(&event);
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
