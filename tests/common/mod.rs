//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, http::Method, http::StatusCode, routing::any, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use loop_breaker::config::{BreakerConfig, RemediationKind};
use loop_breaker::http::HttpServer;
use loop_breaker::lifecycle::{build_breaker, Shutdown};

/// One request seen by the mock Kubernetes API.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

/// Body the API server sends when the namespace does not exist.
pub const NAMESPACE_NOT_FOUND: &str =
    r#"{"kind":"Status","apiVersion":"v1","status":"Failure","reason":"NotFound","code":404}"#;

/// A mock Kubernetes API server that records every request and answers with a fixed status.
pub struct MockApi {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockApi {
    pub async fn start(status: StatusCode) -> Self {
        Self::start_with_body(status, "").await
    }

    pub async fn start_with_body(status: StatusCode, response_body: &'static str) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/{*path}",
                any(
                    move |State(log): State<Arc<Mutex<Vec<RecordedRequest>>>>,
                          method: Method,
                          uri: axum::http::Uri,
                          headers: axum::http::HeaderMap,
                          body: String| async move {
                        log.lock().unwrap().push(RecordedRequest {
                            method,
                            path: uri.path().to_string(),
                            authorization: headers
                                .get("authorization")
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string),
                            body,
                        });
                        (status, response_body)
                    },
                ),
            )
            .with_state(requests.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// A running loop breaker bound to an ephemeral port.
pub struct RunningBreaker {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl RunningBreaker {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Config that deletes `namespace` through the mock API, unauthenticated.
pub fn kubernetes_config(api: &MockApi, namespace: &str, max_events: u64, window_secs: u64) -> BreakerConfig {
    let mut config = BreakerConfig::default();
    config.threshold.max_events = max_events;
    config.threshold.window_secs = window_secs;
    config.remediation.kind = RemediationKind::Kubernetes;
    config.remediation.namespace = namespace.to_string();
    config.remediation.timeout_secs = 5;
    config.kubernetes.api_url = api.url();
    config.kubernetes.token_path = None;
    config.kubernetes.ca_path = None;
    config
}

pub async fn start_breaker(config: BreakerConfig) -> RunningBreaker {
    let breaker = build_breaker(&config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, breaker);
    let handle = tokio::spawn(server.run(listener, shutdown.clone()));

    RunningBreaker {
        addr,
        shutdown,
        handle,
    }
}

/// POST one binary-mode CloudEvent.
pub async fn send_event(client: &reqwest::Client, breaker: &RunningBreaker, id: &str) -> reqwest::Response {
    client
        .post(breaker.url("/"))
        .header("ce-id", id)
        .header("ce-source", "/integration")
        .header("ce-type", "io.example.loop")
        .header("ce-specversion", "1.0")
        .header("content-type", "application/json")
        .body("{\"hop\":1}")
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .unwrap()
}
