//! Shared utilities for pipeline and end-to-end tests.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use futures_util::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use filter_gateway::dispatch::{DispatchError, Dispatcher};
use filter_gateway::filter::{
    Filter, FilterError, FilterOutcome, FilterRegistry, GatewayResponse, Phase, RequestContext,
    RequestSnapshot,
};
use filter_gateway::observability::{EventSink, PipelineEvent};
use filter_gateway::pipeline::PipelineExecutor;

/// Start a mock backend that answers every request with `status` and `body`.
pub async fn start_mock_backend(addr: SocketAddr, status: u16, body: &'static str) {
    start_programmable_backend(addr, move |_| async move { (status, body.to_string()) }).await;
}

/// Start a mock backend whose reply is computed from the request line.
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let head = String::from_utf8_lossy(&buf[..n]);
                let request_line = head.lines().next().unwrap_or_default().to_string();

                let (status, body) = f(request_line).await;
                let reason = StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("OK");
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
}

/// Event sink keeping every event for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &PipelineEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

type Guard = Box<dyn Fn(&RequestContext) -> Result<bool, FilterError> + Send + Sync>;
type Body = Box<dyn Fn(&mut RequestContext) -> FilterOutcome + Send + Sync>;

/// Filter assembled from closures; records its id in the shared trail when run.
pub struct ScriptedFilter {
    id: String,
    phase: Phase,
    priority: i32,
    trail: Arc<Mutex<Vec<String>>>,
    guard: Guard,
    body: Body,
}

impl ScriptedFilter {
    pub fn new(id: &str, phase: Phase, priority: i32, trail: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            id: id.to_string(),
            phase,
            priority,
            trail: trail.clone(),
            guard: Box::new(|_| Ok(true)),
            body: Box::new(|_| FilterOutcome::Continue),
        }
    }

    pub fn when<G>(mut self, guard: G) -> Self
    where
        G: Fn(&RequestContext) -> Result<bool, FilterError> + Send + Sync + 'static,
    {
        self.guard = Box::new(guard);
        self
    }

    pub fn does<B>(mut self, body: B) -> Self
    where
        B: Fn(&mut RequestContext) -> FilterOutcome + Send + Sync + 'static,
    {
        self.body = Box::new(body);
        self
    }

    pub fn arc(self) -> Arc<dyn Filter> {
        Arc::new(self)
    }
}

impl Filter for ScriptedFilter {
    fn id(&self) -> &str {
        &self.id
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn should_run(&self, ctx: &RequestContext) -> Result<bool, FilterError> {
        (self.guard)(ctx)
    }

    fn run(&self, ctx: &mut RequestContext) -> FilterOutcome {
        self.trail.lock().unwrap().push(self.id.clone());
        (self.body)(ctx)
    }
}

/// Dispatcher answering after an optional delay with a fixed result.
pub struct StubDispatcher {
    delay: Duration,
    result: Result<(u16, &'static str), u16>,
    pub calls: Mutex<Vec<Url>>,
}

impl StubDispatcher {
    pub fn ok(status: u16, body: &'static str) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok((status, body)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status_code: u16) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(status_code),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn called_with(&self) -> Vec<Url> {
        self.calls.lock().unwrap().clone()
    }
}

impl Dispatcher for StubDispatcher {
    fn dispatch<'a>(
        &'a self,
        upstream: &'a Url,
        _request: &'a RequestSnapshot,
    ) -> BoxFuture<'a, Result<GatewayResponse, DispatchError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(upstream.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.result {
                Ok((status, body)) => {
                    Ok(GatewayResponse::new(StatusCode::from_u16(status).unwrap()).with_body(body))
                }
                Err(status_code) => Err(DispatchError::Status { status_code }),
            }
        })
    }
}

pub fn trail() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn ran(trail: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    trail.lock().unwrap().clone()
}

/// Executor over `filters` with a recording sink attached.
pub fn executor(
    filters: Vec<Arc<dyn Filter>>,
    dispatcher: Arc<dyn Dispatcher>,
) -> (PipelineExecutor, Arc<RecordingSink>) {
    let registry = FilterRegistry::new();
    for filter in filters {
        registry.register(filter).unwrap();
    }
    let sink = Arc::new(RecordingSink::default());
    let executor = PipelineExecutor::new(Arc::new(registry), dispatcher).with_events(sink.clone());
    (executor, sink)
}
