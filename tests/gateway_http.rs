//! End-to-end tests: reqwest client → gateway → mock backend.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use filter_gateway::config::{GatewayConfig, RouteConfig};
use filter_gateway::lifecycle::{build_executor, build_registry, Shutdown};
use filter_gateway::observability::PipelineEvent;
use filter_gateway::pipeline::{Fault, Stage};
use filter_gateway::GatewayServer;

mod common;

fn country_route(name: &str, value: &str, upstream: SocketAddr) -> RouteConfig {
    RouteConfig {
        name: name.into(),
        priority: 1,
        upstream: format!("http://{}", upstream),
        query_param: Some("country".into()),
        query_value: Some(value.into()),
        path_prefix: None,
        host: None,
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

async fn start_gateway(
    config: GatewayConfig,
    addr: SocketAddr,
) -> (Shutdown, mpsc::UnboundedSender<GatewayConfig>, tokio::task::JoinHandle<()>) {
    let shutdown = Shutdown::new();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let server = GatewayServer::new(config).unwrap();
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let signal = shutdown.subscribe();

    let handle = tokio::spawn(async move {
        server.run(listener, Some(update_rx), signal).await.unwrap();
    });

    (shutdown, update_tx, handle)
}

#[tokio::test]
async fn test_routes_by_query_and_echoes_request_id() {
    let backend_addr: SocketAddr = "127.0.0.1:28281".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28282".parse().unwrap();

    common::start_programmable_backend(backend_addr, |request_line| async move {
        (200, request_line)
    })
    .await;

    let mut config = GatewayConfig::default();
    config.listener.bind_address = gateway_addr.to_string();
    config.routes.push(country_route("india", "india", backend_addr));
    let (shutdown, _updates, handle) = start_gateway(config, gateway_addr).await;

    let res = client()
        .get(format!("http://{}/search?country=india", gateway_addr))
        .header("x-request-id", "e2e-1")
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers().get("x-request-id").unwrap(), "e2e-1");
    assert_eq!(res.text().await.unwrap(), "GET /search?country=india HTTP/1.1");

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server should stop after shutdown")
        .unwrap();
}

#[tokio::test]
async fn test_unmatched_request_gets_json_404() {
    let backend_addr: SocketAddr = "127.0.0.1:28283".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28284".parse().unwrap();

    common::start_mock_backend(backend_addr, 200, "hello").await;

    let mut config = GatewayConfig::default();
    config.routes.push(country_route("india", "india", backend_addr));
    let (shutdown, _updates, _handle) = start_gateway(config, gateway_addr).await;

    let res = client()
        .get(format!("http://{}/?country=pakistan", gateway_addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 404);
    let request_id = res.headers().get("x-request-id").unwrap().to_str().unwrap().to_string();
    let body: serde_json::Value = serde_json::from_str(&res.text().await.unwrap()).unwrap();
    assert_eq!(body["error"], "no_route_matched");
    assert_eq!(body["request_id"], request_id.as_str());

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_server_error_is_rendered() {
    let backend_addr: SocketAddr = "127.0.0.1:28285".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28286".parse().unwrap();

    common::start_mock_backend(backend_addr, 503, "Service Unavailable").await;

    let mut config = GatewayConfig::default();
    config.routes.push(country_route("india", "india", backend_addr));
    let (shutdown, _updates, _handle) = start_gateway(config, gateway_addr).await;

    let res = client()
        .get(format!("http://{}/?country=india", gateway_addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    let body: serde_json::Value = serde_json::from_str(&res.text().await.unwrap()).unwrap();
    assert_eq!(body["error"], "upstream_error");
    assert_eq!(body["message"], "upstream request failed with status 503");

    shutdown.trigger();
}

#[tokio::test]
async fn test_reload_swaps_routes() {
    let backend_addr: SocketAddr = "127.0.0.1:28287".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28288".parse().unwrap();

    common::start_mock_backend(backend_addr, 200, "dawn").await;

    let mut config = GatewayConfig::default();
    config.routes.push(country_route("india", "india", backend_addr));
    let (shutdown, updates, _handle) = start_gateway(config, gateway_addr).await;

    let url = format!("http://{}/?country=pak", gateway_addr);
    assert_eq!(client().get(&url).send().await.unwrap().status(), 404);

    let mut next = GatewayConfig::default();
    next.routes.push(country_route("pak", "pak", backend_addr));
    updates.send(next).unwrap();

    let mut status = 0;
    for _ in 0..50 {
        status = client().get(&url).send().await.unwrap().status().as_u16();
        if status == 200 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(status, 200);

    shutdown.trigger();
}

#[tokio::test]
async fn test_client_abort_mid_dispatch_records_disconnect() {
    let backend_addr: SocketAddr = "127.0.0.1:28289".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28290".parse().unwrap();

    common::start_programmable_backend(backend_addr, |_| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        (200, "too late".to_string())
    })
    .await;

    let mut config = GatewayConfig::default();
    config.timeouts.dispatch_ms = 10_000;
    config.routes.push(country_route("india", "india", backend_addr));

    let sink = Arc::new(common::RecordingSink::default());
    let registry = build_registry(&config).unwrap();
    let executor = Arc::new(build_executor(&config, registry, sink.clone()));
    let server = GatewayServer::from_parts(config, executor);

    let shutdown = Shutdown::new();
    let listener = tokio::net::TcpListener::bind(gateway_addr).await.unwrap();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, None, signal).await;
    });

    let aborted = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap()
        .get(format!("http://{}/?country=india", gateway_addr))
        .send()
        .await;
    assert!(aborted.is_err(), "client should give up before the backend answers");

    let mut events = Vec::new();
    for _ in 0..100 {
        events = sink.events();
        if events.iter().any(|e| matches!(e, PipelineEvent::Completed { .. })) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(events.iter().any(|e| matches!(
        e,
        PipelineEvent::FaultRecorded {
            stage: Stage::Dispatch,
            fault: Fault::ClientDisconnected,
            ..
        }
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        PipelineEvent::Completed {
            status: 499,
            fault: Some("client_disconnected"),
            ..
        }
    )));

    shutdown.trigger();
}
