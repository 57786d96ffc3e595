//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! PipelineExecutor
//!     → events.rs (PipelineEvent emitted to an EventSink)
//!         → logging.rs (TracingSink: structured log records)
//!         → metrics.rs (MetricsSink: counters and histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout via tracing-subscriber)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - The pipeline core never logs; it only emits events
//! - Request ID is carried on every event
//! - Sinks are composable through FanoutSink

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{EventSink, FanoutSink, NoopSink, PipelineEvent};
pub use logging::TracingSink;
pub use metrics::MetricsSink;
