//! MCP Server Entry Point
//!
//! Reads configuration from the environment, sets up logging on stderr, builds
//! the front door and starts the configured transport(s). See
//! `core::config` for the recognised environment variables.

use anyhow::{Context, Result};
use calculator_mcp::core::server;
use calculator_mcp::{ServerConfig, TransportMode};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout belongs to the STDIO transport
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = ServerConfig::from_env()?;
    let door = server::build_front_door(config.server_info());

    match config.transport {
        TransportMode::Stdio => server::run_server_stdio(&config, door)
            .await
            .context("STDIO transport failed"),
        TransportMode::Http => server::run_server_http(&config, door)
            .await
            .with_context(|| format!("HTTP server failed on {}", config.bind_addr())),
        TransportMode::Both => {
            // Both transports share one front door, and therefore one session.
            let stdio_config = config.clone();
            let stdio_door = door.clone();
            let stdio_handle = tokio::spawn(async move {
                if let Err(e) = server::run_server_stdio(&stdio_config, stdio_door).await {
                    error!(error = %e, "STDIO server error");
                }
            });

            let http_result = server::run_server_http(&config, door).await;

            // If HTTP server exits, abort STDIO task
            stdio_handle.abort();

            http_result.with_context(|| format!("HTTP server failed on {}", config.bind_addr()))
        }
    }
}
