//! HTTP transport subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, tracing, body limit)
//!     → request.rs (axum Request → RequestSnapshot)
//!     → PipelineExecutor (filters, routing, dispatch)
//!     → response.rs (GatewayResponse → axum Response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::snapshot_from_request;
pub use server::GatewayServer;
