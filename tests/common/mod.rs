//! Shared utilities for integration tests.

use std::time::Duration;

use resilience_mock::http::server::{AppState, MockServer};
use resilience_mock::scenario::spec::{ResponseSpec, Scenario};
use resilience_mock::ServerConfig;

/// A running server plus handles for assertions.
#[allow(dead_code)]
pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Spawn the server on an ephemeral port and wait until it accepts
/// connections.
pub async fn spawn_server(config: ServerConfig, scenarios: Vec<Scenario>) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("ephemeral bind");
    let addr = listener.local_addr().expect("local addr");

    let server = MockServer::new(config, scenarios);
    let state = server.state().clone();
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    for _ in 0..50 {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    TestServer {
        base_url: format!("http://{addr}"),
        state,
    }
}

/// Spawn with defaults but quiet request logging.
pub async fn spawn_default() -> TestServer {
    let config = ServerConfig {
        log_requests: false,
        ..Default::default()
    };
    spawn_server(config, Vec::new()).await
}

/// Build a one-response scenario.
#[allow(dead_code)]
pub fn scenario(path: &str, method: &str, response: ResponseSpec) -> Scenario {
    Scenario::new(path, method, vec![response])
}

/// An HTTP client that ignores proxies and connection pools, so tests hit
/// the spawned server directly.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .build()
        .expect("client builds")
}
