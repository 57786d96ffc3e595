//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all handler
//! - Wire up middleware (request ID, tracing, body limit)
//! - Hand every request to the pipeline executor
//! - Signal the pipeline when a client disconnects mid-request
//! - Apply route updates from the config watcher
//! - Stop accepting and drain on shutdown

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::filter::FilterRegistry;
use crate::http::request::snapshot_from_request;
use crate::lifecycle::{build_executor, build_registry, default_events, reload_routes, ShutdownSignal, StartupError};
use crate::pipeline::PipelineExecutor;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<PipelineExecutor>,
    pub max_body_bytes: usize,
}

/// HTTP front end of the gateway.
pub struct GatewayServer {
    config: GatewayConfig,
    executor: Arc<PipelineExecutor>,
}

impl GatewayServer {
    /// Build the registry and executor described by `config`.
    pub fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        let registry = build_registry(&config)?;
        let executor = build_executor(&config, registry, default_events(&config));
        Ok(Self::from_parts(config, Arc::new(executor)))
    }

    /// Serve an already assembled executor.
    pub fn from_parts(config: GatewayConfig, executor: Arc<PipelineExecutor>) -> Self {
        Self { config, executor }
    }

    pub fn executor(&self) -> &Arc<PipelineExecutor> {
        &self.executor
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Router {
        let state = AppState {
            executor: self.executor.clone(),
            max_body_bytes: self.config.limits.max_body_bytes,
        };

        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(RequestBodyLimitLayer::new(self.config.limits.max_body_bytes));

        Router::new()
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(state)
            .layer(middleware)
    }

    /// Run the server until `shutdown` fires, applying route updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: Option<mpsc::UnboundedReceiver<GatewayConfig>>,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway server starting");

        if let Some(updates) = config_updates {
            let registry = self.executor.registry().clone();
            tokio::spawn(apply_updates(registry, updates));
        }

        let app = self.router();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.recv().await })
            .await?;

        tracing::info!("Gateway server stopped");
        Ok(())
    }
}

async fn apply_updates(registry: Arc<FilterRegistry>, mut updates: mpsc::UnboundedReceiver<GatewayConfig>) {
    while let Some(config) = updates.recv().await {
        match reload_routes(&registry, &config) {
            Ok(routes) => tracing::info!(routes, "Routes reloaded"),
            Err(e) => tracing::error!(error = %e, "Route reload rejected, keeping current routes"),
        }
    }
}

/// Catch-all handler: snapshot the request and run it through the pipeline.
///
/// The pipeline runs on its own task so a dropped connection surfaces as
/// `ClientDisconnected` instead of silently cancelling the request.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let snapshot = match snapshot_from_request(request, state.max_body_bytes).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to buffer request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    // Dropped together with this handler when the client goes away.
    let (_connected, closed) = oneshot::channel::<()>();
    let executor = state.executor.clone();
    let pipeline = tokio::spawn(async move {
        let disconnect = async move {
            let _ = closed.await;
        };
        executor.execute_with_disconnect(snapshot, disconnect).await
    });

    match pipeline.await {
        Ok(done) => done.response.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Pipeline task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
