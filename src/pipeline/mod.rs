//! Pipeline execution subsystem.
//!
//! # Data Flow
//! ```text
//! RequestSnapshot
//!     → executor.rs (RequestContext, state machine over phases)
//!         → registry snapshot per phase
//!         → Dispatcher for matched routes (deadline + disconnect race)
//!     → fault.rs (fault taxonomy, default status mapping)
//!     → Completion (response + final context)
//! ```

pub mod executor;
pub mod fault;

pub use executor::{Completion, PipelineExecutor, Stage, DEFAULT_DISPATCH_TIMEOUT, REQUEST_ID_HEADER};
pub use fault::Fault;
