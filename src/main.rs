//! Resilience Mock CLI entry point.
//!
//! A programmable HTTP fault-injection server built with Tokio and Axum.
//!
//! ```text
//!  Client Request ──▶ middleware (id, history, CORS, limit)
//!                         │
//!                fixed route? ──▶ echo / control / stress / streaming
//!                         │
//!                     dispatcher ──▶ path match ─▶ predicates ─▶ breaker
//!                         │                                        │
//!                     404 / echo                       response rotation,
//!                                                      delay, template, gzip
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resilience_mock::config::{load_config, ServerConfig};
use resilience_mock::MockServer;

#[derive(Parser, Debug)]
#[command(
    name = "resilience-mock",
    about = "Programmable HTTP fault-injection server for testing client resilience",
    version
)]
struct Args {
    /// Path to the scenario file
    #[arg(short, long, default_value = "scenarios.yaml")]
    scenarios: PathBuf,

    /// Print the default configuration as YAML and exit
    #[arg(long)]
    print_config: bool,

    /// Validate the scenario file and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resilience_mock=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if args.print_config {
        println!("{}", serde_yaml::to_string(&ServerConfig::default())?);
        return Ok(());
    }

    if args.validate && !args.scenarios.exists() {
        anyhow::bail!("scenario file not found: {:?}", args.scenarios);
    }

    let (config, scenarios) = load_config(&args.scenarios)?;

    if args.validate {
        println!("Configuration is valid ({} scenarios defined)", scenarios.len());
        return Ok(());
    }

    tracing::info!(
        port = config.port,
        tls = config.enable_tls,
        cors = config.enable_cors,
        max_body_size = config.max_body_size,
        history_size = config.history_size,
        "configuration loaded"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let enable_tls = config.enable_tls;
    let server = MockServer::new(config, scenarios);
    let listener = TcpListener::bind(addr).await?;

    if enable_tls {
        server.run_tls(listener).await?;
    } else {
        server.run(listener).await?;
    }

    tracing::info!("shutdown complete");
    Ok(())
}
