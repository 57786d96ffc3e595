//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Build registry (built-ins + routes) → Build executor → Start listener
//!
//! Reload (startup.rs):
//!     New validated config → recompile routes → swap route phase
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     Ctrl+C or trigger → Stop accepting → Drain in-flight requests → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then registry, then listeners
//! - Fail fast: any startup error is fatal
//! - A failed reload keeps the previous filters

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{build_executor, build_registry, default_events, reload_routes, StartupError};
