//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! RequestSnapshot (host, path, query)
//!     → router.rs (RouteFilter per configured route)
//!     → matcher.rs (evaluate match conditions)
//!     → decision.rs (Matched{upstream} or Unmatched into the context)
//!
//! Route Compilation (at startup and on reload):
//!     RouteConfig[]
//!     → compile matchers, parse upstream URLs
//!     → registered as Route-phase filters
//! ```
//!
//! # Design Decisions
//! - No regex in hot path (prefix and exact matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by priority, then registration)

pub mod decision;
pub mod matcher;
pub mod router;

pub use decision::RoutingDecision;
pub use router::{compile_routes, RouteError, RouteFilter};
