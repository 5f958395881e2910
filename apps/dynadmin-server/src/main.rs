//! dynadmin server: a JSON admin API for browsing DynamoDB tables.
//!
//! # Usage
//!
//! ```text
//! DYNAMO_ENDPOINT=http://localhost:8000 dynadmin-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DYNADMIN_LISTEN` | `0.0.0.0:8001` | Bind address |
//! | `DYNAMO_ENDPOINT` | `http://localhost:8000` | DynamoDB endpoint |
//! | `AWS_REGION` / `DEFAULT_REGION` | `us-east-1` | Signing region |
//! | `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` | `key` / `secret` | Credentials |
//! | `DYNADMIN_PAGE_SIZE` | `25` | Items per browse page |
//! | `DYNADMIN_MAX_CALLS` | `10` | Store calls allowed per page |
//! | `DYNADMIN_REQUEST_TIMEOUT_SECS` | `30` | Per-call timeout |
//! | `DYNADMIN_MAX_BODY_BYTES` | `512000` | Request body limit |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use dynadmin_client::{ClientConfig, DynamoDbClient};
use dynadmin_core::{AdminConfig, AdminProvider};
use dynadmin_http::{AdminHttpConfig, AdminHttpService, ProviderHandler};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_LISTEN: &str = "0.0.0.0:8001";

/// Uses `RUST_LOG` if set, otherwise `log_level`.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Accept connections until Ctrl-C, then drain the ones in flight.
async fn serve(listener: TcpListener, service: AdminHttpService<ProviderHandler>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let conn = http.serve_connection(TokioIo::new(stream), service.clone());
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");
    Ok(())
}

/// Probe `/health` on a running server. Used as a container health check.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;
    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if is_healthy_response(&response) {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

fn is_healthy_response(response: &str) -> bool {
    response.starts_with("HTTP/1.1 200") && response.contains("\"ok\"")
}

fn listen_addr() -> String {
    env_or("DYNADMIN_LISTEN", DEFAULT_LISTEN)
}

fn log_level() -> String {
    env_or("LOG_LEVEL", "info")
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_owned())
}

/// The address a local health probe connects to.
fn probe_addr(listen: &str) -> String {
    listen.replace("0.0.0.0", "127.0.0.1")
}

#[tokio::main]
async fn main() -> Result<()> {
    let listen = listen_addr();

    if std::env::args().any(|a| a == "--health-check") {
        let healthy = run_health_check(&probe_addr(&listen)).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&log_level())?;

    let client_config = ClientConfig::from_env();
    let admin_config = AdminConfig::from_env();
    let http_config = AdminHttpConfig::from_env();
    info!(
        endpoint = %client_config.endpoint,
        region = %client_config.region,
        timeout_secs = client_config.timeout.as_secs(),
        page_size = admin_config.page_size,
        max_calls = admin_config.max_calls,
        max_body_bytes = http_config.max_body_bytes,
        "initializing dynadmin",
    );

    let client = DynamoDbClient::new(client_config).context("failed to create DynamoDB client")?;
    let provider = AdminProvider::new(admin_config, Arc::new(client));
    let service = AdminHttpService::new(Arc::new(ProviderHandler::new(provider)), http_config);

    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("invalid bind address: {listen}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, version = VERSION, "starting dynadmin server");
    serve(listener, service).await
}
