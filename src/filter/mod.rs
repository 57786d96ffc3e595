//! Filter abstraction subsystem.
//!
//! # Data Flow
//! ```text
//! Startup / hot reload
//!     → registry.rs (register filters per phase, ordered by priority)
//!
//! Per request:
//!     → context.rs (RequestContext created from the request snapshot)
//!     → each Filter: should_run(ctx)? → run(ctx) → FilterOutcome
//! ```
//!
//! # Design Decisions
//! - Filters are synchronous; only Dispatch suspends
//! - Context is passed explicitly as `&mut`, never through globals
//! - Lower priority value runs first; ties keep registration order

pub mod context;
pub mod registry;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pipeline::Fault;

pub use context::{GatewayResponse, QueryParams, RequestContext, RequestSnapshot};
pub use registry::{FilterRegistry, PhaseFilters, RegistryError};

/// Error returned by a filter's eligibility check.
pub type FilterError = Box<dyn std::error::Error + Send + Sync>;

/// The four fixed stages a request passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Pre,
    Route,
    Post,
    Error,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Phase; 4] = [Phase::Pre, Phase::Route, Phase::Post, Phase::Error];

    pub(crate) fn index(self) -> usize {
        match self {
            Phase::Pre => 0,
            Phase::Route => 1,
            Phase::Post => 2,
            Phase::Error => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Pre => "pre",
            Phase::Route => "route",
            Phase::Post => "post",
            Phase::Error => "error",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a filter's `run`.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    /// Proceed to the next filter in the phase.
    Continue,
    /// Stop the current phase and skip to response emission.
    ShortCircuit,
    /// Abort the phase and transition to the error phase.
    Fail(Fault),
}

impl FilterOutcome {
    /// Fail the request with an explicit status and reason.
    ///
    /// Statuses outside 4xx/5xx render as 500.
    pub fn reject(status: u16, reason: impl Into<String>) -> Self {
        FilterOutcome::Fail(Fault::Rejected {
            status,
            reason: reason.into(),
        })
    }

    pub(crate) fn kind(&self) -> OutcomeKind {
        match self {
            FilterOutcome::Continue => OutcomeKind::Continue,
            FilterOutcome::ShortCircuit => OutcomeKind::ShortCircuit,
            FilterOutcome::Fail(_) => OutcomeKind::Fail,
        }
    }
}

/// Payload-free view of a [`FilterOutcome`], carried by observability events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Continue,
    ShortCircuit,
    Fail,
    Panicked,
}

impl OutcomeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeKind::Continue => "continue",
            OutcomeKind::ShortCircuit => "short_circuit",
            OutcomeKind::Fail => "fail",
            OutcomeKind::Panicked => "panicked",
        }
    }
}

/// A unit of per-request logic registered against exactly one phase.
///
/// Implementations must be `Send + Sync`: one instance is shared by every
/// request that passes through the registry.
pub trait Filter: Send + Sync {
    /// Stable identifier used in events and fault reports.
    fn id(&self) -> &str;

    /// Phase this filter belongs to.
    fn phase(&self) -> Phase;

    /// Ordering within the phase (lower runs first).
    fn priority(&self) -> i32;

    /// Returns true if the filter applies to this request.
    ///
    /// An `Err` is treated as a filter fault and fails the request.
    fn should_run(&self, _ctx: &RequestContext) -> Result<bool, FilterError> {
        Ok(true)
    }

    /// Execute the filter against the request context.
    fn run(&self, ctx: &mut RequestContext) -> FilterOutcome;
}

impl fmt::Debug for dyn Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("id", &self.id())
            .field("phase", &self.phase())
            .field("priority", &self.priority())
            .finish()
    }
}
