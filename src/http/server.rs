//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID, timeout)
//! - Bind server to listener
//! - Hand every inbound event to the breaker
//! - Run the window reset loop for the server's lifetime
//!
//! # Design Decisions
//! - Every event is acknowledged, tripped or not
//! - Every event is counted, even when its body is over the size limit
//! - Observation runs in its own task so a dropped request cannot cancel remediation

use axum::{
    body::{self, Bytes},
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::setup_admin_router;
use crate::breaker::{Breaker, ObservedEvent, Outcome, ResetLoop};
use crate::config::BreakerConfig;
use crate::http::cloudevent::CloudEvent;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::lifecycle::Shutdown;

/// Set to `true` on the response to the event that tripped the breaker.
pub const TRIPPED_HEADER: &str = "x-loop-breaker-tripped";
/// `succeeded` or `failed`, alongside [`TRIPPED_HEADER`].
pub const REMEDIATION_HEADER: &str = "x-loop-breaker-remediation";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub breaker: Arc<Breaker>,
    pub reply_with_event: bool,
    pub max_body_bytes: usize,
    pub admin_api_key: Arc<str>,
}

/// HTTP event receiver.
pub struct HttpServer {
    router: Router,
    config: BreakerConfig,
    breaker: Arc<Breaker>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: BreakerConfig, breaker: Arc<Breaker>) -> Self {
        let state = AppState {
            breaker: breaker.clone(),
            reply_with_event: config.receiver.reply_with_event,
            max_body_bytes: config.receiver.max_body_bytes,
            admin_api_key: Arc::from(config.admin.api_key.as_str()),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            breaker,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &BreakerConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/", post(receive_event))
            .route("/healthz", get(healthz))
            .with_state(state.clone());

        if config.admin.enabled {
            router = router.merge(setup_admin_router(state));
        }

        router
            .layer(TimeoutLayer::new(Duration::from_secs(config.receiver.request_timeout_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for serving or driving directly in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener, until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            admin_enabled = self.config.admin.enabled,
            "HTTP server starting"
        );

        let reset_loop = ResetLoop::new(self.breaker.clone()).spawn(shutdown.subscribe());

        let mut server_shutdown = shutdown.subscribe();
        let result = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await;

        // Stop the reset loop even if the server failed on its own.
        shutdown.trigger();
        if let Err(e) = reset_loop.await {
            tracing::error!(error = %e, "Window reset loop panicked");
        }

        tracing::info!("HTTP server stopped");
        result
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }
}

/// Receive one CloudEvent and count it.
async fn receive_event(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let headers = parts.headers;
    let request_id = request_id(&headers).to_string();

    // An oversized or broken body still counts as an event; only its data is lost.
    let body = match body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                max_body_bytes = state.max_body_bytes,
                error = %e,
                "Event body unreadable or over the limit, counting without data"
            );
            Bytes::new()
        }
    };
    let event = CloudEvent::from_http(&headers, body);

    tracing::info!(
        request_id = %request_id,
        event_id = %event.id,
        event_type = %event.ty,
        event_source = %event.source,
        "Received event"
    );

    let observed = ObservedEvent::from(&event);
    let breaker = state.breaker.clone();
    let outcome = match tokio::spawn(async move { breaker.observe(&observed).await }).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Event observation task failed");
            Outcome::Accepted
        }
    };

    let mut response = if state.reply_with_event {
        event.into_binary_response()
    } else {
        StatusCode::ACCEPTED.into_response()
    };

    if let Some(report) = outcome.report() {
        let result = if report.succeeded() { "succeeded" } else { "failed" };
        let headers = response.headers_mut();
        headers.insert(TRIPPED_HEADER, HeaderValue::from_static("true"));
        headers.insert(REMEDIATION_HEADER, HeaderValue::from_static(result));
    }

    response
}

async fn healthz() -> &'static str {
    "ok"
}
