//! Filter-chain gateway library.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ RequestSnapshot
//!                                          │
//!                                          ▼
//!                     ┌─────────── pipeline::PipelineExecutor ───────────┐
//!                     │  Pre filters → Route filters → Dispatch → Post   │
//!                     │        │             │            │        │     │
//!                     │        └──── fault ──┴────────────┴────────┘     │
//!                     │                      ▼                           │
//!                     │                Error filters                     │
//!                     └──────────────────────┬───────────────────────────┘
//!                                            │
//!     Client Response ◀── http::response ◀───┘
//!
//!     filter::FilterRegistry   copy-on-write phase lists, hot-swappable
//!     routing                  route filters compiled from config
//!     dispatch                 upstream HTTP client
//!     observability            events → tracing + metrics
//! ```

// Pipeline core
pub mod filter;
pub mod pipeline;
pub mod routing;

// Edges
pub mod config;
pub mod dispatch;
pub mod filters;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::GatewayConfig;
pub use filter::{Filter, FilterOutcome, FilterRegistry, Phase, RequestContext, RequestSnapshot};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use pipeline::{Completion, Fault, PipelineExecutor};
