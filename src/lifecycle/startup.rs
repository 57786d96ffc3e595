//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the filter registry from built-ins and configured routes
//! - Build the pipeline executor with its dispatcher and event sinks
//! - Re-apply routes when a new configuration arrives

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::GatewayConfig;
use crate::dispatch::HttpDispatcher;
use crate::filter::{FilterRegistry, Phase, RegistryError};
use crate::filters::{ErrorBodyFilter, RequestIdFilter};
use crate::observability::{EventSink, FanoutSink, MetricsSink, TracingSink};
use crate::pipeline::PipelineExecutor;
use crate::routing::{compile_routes, RouteError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Registry holding the built-in filters and one route filter per configured route.
pub fn build_registry(config: &GatewayConfig) -> Result<Arc<FilterRegistry>, StartupError> {
    let registry = FilterRegistry::with_strict_priorities(config.registry.strict_priorities);
    registry.register(Arc::new(RequestIdFilter::default()))?;
    registry.register(Arc::new(ErrorBodyFilter::default()))?;
    reload_routes(&registry, config)?;
    Ok(Arc::new(registry))
}

/// Replace the route phase with the routes of `config`.
///
/// On error the registry keeps its previous routes.
pub fn reload_routes(registry: &FilterRegistry, config: &GatewayConfig) -> Result<usize, StartupError> {
    let routes = compile_routes(&config.routes)?;
    let count = routes.len();
    registry.replace_phase(Phase::Route, routes)?;
    Ok(count)
}

/// Event sinks for the configured observability settings.
pub fn default_events(config: &GatewayConfig) -> Arc<dyn EventSink> {
    let mut sinks = FanoutSink::new().with(Arc::new(TracingSink));
    if config.observability.metrics_enabled {
        sinks = sinks.with(Arc::new(MetricsSink));
    }
    Arc::new(sinks)
}

/// Executor dispatching over HTTP with the configured deadlines.
pub fn build_executor(
    config: &GatewayConfig,
    registry: Arc<FilterRegistry>,
    events: Arc<dyn EventSink>,
) -> PipelineExecutor {
    let dispatcher = HttpDispatcher::new(
        Duration::from_millis(config.timeouts.connect_ms),
        config.limits.max_body_bytes,
    );

    PipelineExecutor::new(registry, Arc::new(dispatcher))
        .with_events(events)
        .with_dispatch_timeout(Duration::from_millis(config.timeouts.dispatch_ms))
}
