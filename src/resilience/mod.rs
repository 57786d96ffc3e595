//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch of a matched request:
//!     → timeouts.rs (race upstream call vs. deadline vs. client disconnect)
//!     → first to finish decides: response, UpstreamTimeout or ClientDisconnected
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every dispatch has a deadline
//! - Losing futures are dropped, which cancels the upstream call
//! - No retries: a filter chain decides what a failure means

pub mod timeouts;

pub use timeouts::{race_dispatch, DispatchRace};
