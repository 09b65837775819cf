//! HTTP server setup and request routing.
//!
//! # Responsibilities
//! - Build the Axum router with all fixed endpoints
//! - Wire up the middleware chain (request ID, history/metrics, CORS,
//!   rate limiting)
//! - Route everything unbound through the scenario dispatcher
//! - Run plaintext or TLS with graceful shutdown

use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::config::schema::ServerConfig;
use crate::faults::{echo, inject, stress};
use crate::health::Health;
use crate::history::HistoryBuffer;
use crate::http::control;
use crate::http::middleware::{self, RateLimiter};
use crate::http::request::RequestContext;
use crate::http::streaming;
use crate::faults::template::TemplateEngine;
use crate::net::tls;
use crate::observability::metrics::MockMetrics;
use crate::scenario::registry::ScenarioRegistry;
use crate::scenario::spec::Scenario;

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub registry: Arc<ScenarioRegistry>,
    pub history: Arc<HistoryBuffer>,
    pub metrics: Arc<MockMetrics>,
    pub health: Arc<Health>,
    pub templates: Arc<TemplateEngine>,
    pub limiter: Option<Arc<RateLimiter>>,
    /// Monotonic request counter backing generated request IDs.
    pub request_seq: Arc<AtomicU64>,
    /// Client used by the replay endpoint.
    pub replay_client: reqwest::Client,
}

/// The mock server: router plus the shared state behind it.
pub struct MockServer {
    state: AppState,
    router: Router,
}

impl MockServer {
    /// Build the server from configuration and preloaded scenarios.
    pub fn new(config: ServerConfig, scenarios: Vec<Scenario>) -> Self {
        let registry = Arc::new(ScenarioRegistry::new());
        for scenario in scenarios {
            tracing::info!(
                path = %scenario.path,
                method = %scenario.method,
                responses = scenario.responses.len(),
                "scenario preloaded"
            );
            registry.add(scenario);
        }

        let health = Arc::new(Health::new(&config.hostname));
        health.add_check("ping", Box::new(|| Ok("pong".to_string())));

        let limiter = (config.rate_limit_rps > 0.0)
            .then(|| Arc::new(RateLimiter::new(config.rate_limit_rps)));

        let replay_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client construction cannot fail");

        let state = AppState {
            history: Arc::new(HistoryBuffer::new(config.history_size)),
            config: Arc::new(config),
            registry,
            metrics: Arc::new(MockMetrics::new()),
            health,
            templates: Arc::new(TemplateEngine::new()),
            limiter,
            request_seq: Arc::new(AtomicU64::new(0)),
            replay_client,
        };

        let router = build_router(state.clone());
        Self { state, router }
    }

    /// Shared state, for tests and embedding.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve plaintext HTTP on the given listener until ctrl-c.
    pub async fn run(self, listener: TcpListener) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        print_banner(&self.state.config, addr);
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve TLS on the given listener until ctrl-c.
    pub async fn run_tls(self, listener: TcpListener) -> Result<(), tls::TlsError> {
        let addr = listener.local_addr().map_err(tls::TlsError::Io)?;
        print_banner(&self.state.config, addr);
        tracing::info!(address = %addr, "HTTPS server starting");

        let config = self.state.config.clone();
        tls::serve(
            self.router,
            listener,
            config.cert_file.as_ref(),
            config.key_file.as_ref(),
        )
        .await
    }
}

/// Assemble all routes and layer the middleware chain. Layers added last
/// run first, so the request-ID middleware is outermost.
fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/stress/cpu/{duration}", get(stress::cpu_stress))
        .route("/api/stress/mem/{size}", get(stress::memory_stress))
        .route("/api/control/reset-history", post(control::reset_history))
        .route("/api/control/reset-metrics", post(control::reset_metrics))
        .route("/echo", any(echo_handler))
        .route("/history", get(control::get_history))
        .route("/replay", post(control::replay))
        .route("/scenario", post(control::add_scenario))
        .route("/ws", any(streaming::websocket))
        .route("/sse", get(streaming::sse))
        .route_service("/favicon.ico", ServeFile::new("docs/favicon.ico"))
        .route_service("/web-ws", ServeFile::new("docs/web-ws.html"))
        .route_service("/web-sse", ServeFile::new("docs/web-sse.html"))
        .nest_service("/docs", ServeDir::new("docs"))
        .fallback(dispatch_handler)
        .with_state(state.clone())
        .layer(from_fn_with_state(state.clone(), middleware::rate_limit))
        .layer(from_fn_with_state(state.clone(), middleware::cors))
        .layer(from_fn_with_state(state.clone(), middleware::record))
        .layer(from_fn_with_state(state, middleware::request_id))
        .layer(TraceLayer::new_for_http())
}

/// Catch-all: resolve the request through the scenario engine.
async fn dispatch_handler(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request,
) -> Response {
    let ctx = RequestContext::capture(request, Some(remote), state.config.max_body_size).await;
    inject::dispatch(&state, ctx).await
}

async fn echo_handler(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request,
) -> Response {
    let ctx = RequestContext::capture(request, Some(remote), state.config.max_body_size).await;
    echo::respond(&state.config, &ctx).await
}

async fn health_handler(State(state): State<AppState>) -> Response {
    state.health.respond()
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    let body = state.metrics.export();
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        body,
    )
        .into_response()
}

/// Wait for ctrl-c.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    tracing::info!("shutdown signal received");
}

fn print_banner(config: &ServerConfig, addr: SocketAddr) {
    println!(
        r#"
  ___        _ _ _                   __  __         _
 | _ \___ __(_) (_)___ _ _  __ ___  |  \/  |___  __| |__
 |   / -_|_-< | | / -_) ' \/ _/ -_) | |\/| / _ \/ _| / /
 |_|_\___/__/_|_|_\___|_||_\__\___| |_|  |_\___/\__|_\_\
"#
    );
    println!("Resilience Mock v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "Address: {} | TLS: {} | CORS: {}",
        addr, config.enable_tls, config.enable_cors
    );
    println!("{}", "-".repeat(60));
}
