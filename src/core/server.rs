//! MCP Server Transports
//!
//! This module wires the front door to the outside world:
//! - HTTP server setup with Actix Web
//! - STDIO server implementation for line-based communication
//!
//! Both transports hand raw request bytes to the [`FrontDoor`] and return
//! whatever the session answers without touching it.

use actix_web::{
    App, HttpResponse, HttpServer, Result, web,
    middleware::{Compress, DefaultHeaders, Logger},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tracing::{error, info, warn};

use crate::core::config::ServerConfig;
use crate::core::dispatch::{FrontDoor, LocalNamespace, SessionId};
use crate::core::error::DispatchError;
use crate::core::protocol::{INTERNAL_ERROR, MCPError, MCPResponse};
use crate::core::session::{McpSession, ServerInfo};
use crate::core::validator::JsonSchemaValidator;
use crate::tools;

/// Application state shared across all worker threads in HTTP mode.
#[derive(Clone)]
pub struct AppState {
    /// Server name as reported by the health endpoint
    pub server_name: String,
}

/// Build the front door over an in-process namespace whose sessions carry
/// every tool this server offers.
///
/// # Arguments
/// * `info` - Server name and version reported by every session
pub fn build_front_door(info: ServerInfo) -> FrontDoor {
    let namespace = LocalNamespace::new(Box::new(move |id: &SessionId| {
        info!(session = %id, "initializing session tools");
        McpSession::new(info.clone(), Arc::new(JsonSchemaValidator), tools::register_all)
    }));
    FrontDoor::new(Arc::new(namespace))
}

/// Health check endpoint handler.
async fn health(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": state.server_name
    })))
}

/// MCP JSON-RPC request handler.
///
/// The body is forwarded as-is; parsing happens inside the session.
/// Notifications are acknowledged with 202 and no body.
async fn mcp_handler(
    door: web::Data<FrontDoor>,
    body: web::Bytes,
) -> std::result::Result<HttpResponse, DispatchError> {
    match door.handle(&body).await {
        Ok(Some(response)) => Ok(HttpResponse::Ok().json(response)),
        Ok(None) => Ok(HttpResponse::Accepted().finish()),
        Err(err) => {
            error!(error = %err, "dispatch failed");
            Err(err)
        }
    }
}

/// Register the HTTP routes.
///
/// Expects `web::Data<AppState>` and `web::Data<FrontDoor>` on the app.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/mcp", web::post().to(mcp_handler))
        .route("/", web::post().to(mcp_handler))
        .route("/", web::get().to(health));
}

/// Run the MCP server in HTTP mode.
///
/// The server is configured with:
/// - Worker threads: from configuration (CPU count, max 16)
/// - Max connections: 10,000 concurrent connections
/// - Connection rate limit: 1,000 connections per second
/// - Keep-alive and request timeout: 30 seconds
/// - Shutdown timeout: 10 seconds
///
/// # Arguments
/// * `config` - Bind address and worker count
/// * `door` - Front door shared by every worker
pub async fn run_server_http(config: &ServerConfig, door: FrontDoor) -> std::io::Result<()> {
    let bind_addr = config.bind_addr();
    let app_state = web::Data::new(AppState {
        server_name: config.name.clone(),
    });
    let door = web::Data::new(door);

    info!(
        name = %config.name,
        version = %config.version,
        bind = %bind_addr,
        workers = config.workers,
        "MCP server starting (HTTP mode)"
    );

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(door.clone())
            // Enable compression for JSON responses (gzip/brotli)
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("X-XSS-Protection", "1; mode=block")),
            )
            // %r = request line, %s = status, %Dms = duration in milliseconds
            .wrap(Logger::new("%r %s %Dms"))
            .configure(routes)
    })
    .workers(config.workers)
    .max_connections(10000)
    .max_connection_rate(1000)
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_secs(30))
    .client_disconnect_timeout(Duration::from_secs(2))
    .shutdown_timeout(10)
    .bind(&bind_addr)?
    .run()
    .await
}

/// Run the MCP server in STDIO mode.
///
/// All logging goes to stderr so the protocol stream on stdout stays clean.
///
/// # Arguments
/// * `config` - Name and version for the startup log line
/// * `door` - Front door every line is forwarded to
pub async fn run_server_stdio(config: &ServerConfig, door: FrontDoor) -> std::io::Result<()> {
    info!(name = %config.name, version = %config.version, "MCP server starting (STDIO mode)");

    let stdin = BufReader::with_capacity(8192, tokio::io::stdin());
    let stdout = BufWriter::with_capacity(8192, tokio::io::stdout());
    serve_lines(&door, stdin, stdout).await?;

    info!("stdin closed, STDIO transport stopping");
    Ok(())
}

/// Answer newline-delimited JSON-RPC messages until `reader` is exhausted.
///
/// Blank lines are skipped and notifications produce no output. Every other
/// line yields exactly one response line, flushed immediately.
///
/// # Arguments
/// * `door` - Front door every line is forwarded to
/// * `reader` - Source of request lines
/// * `writer` - Sink for response lines
pub async fn serve_lines<R, W>(door: &FrontDoor, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match door.handle(line.as_bytes()).await {
            Ok(Some(response)) => response,
            Ok(None) => continue,
            Err(err) => {
                error!(error = %err, "dispatch failed");
                MCPResponse::failure(None, MCPError::new(INTERNAL_ERROR, err.to_string()))
            }
        };

        let response_json = match serde_json::to_string(&response) {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "failed to serialize response");
                continue;
            }
        };

        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    use crate::core::dispatch::{SessionNamespace, SessionStub};
    use crate::core::protocol::PARSE_ERROR;

    fn door() -> FrontDoor {
        build_front_door(ServerInfo {
            name: "Authless Calculator".into(),
            version: "1.0.0".into(),
        })
    }

    fn response_lines(output: &[u8]) -> Vec<Value> {
        std::str::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn one_response_line_per_request_line() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"add","arguments":{"a":2,"b":3}}}"#,
            "\n",
            "   \n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            "{not json\n",
        );
        let mut output = Vec::new();

        serve_lines(&door(), input.as_bytes(), &mut output).await.unwrap();

        assert!(output.ends_with(b"\n"));
        let responses = response_lines(&output);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"]["content"][0]["text"], "5");
        assert_eq!(responses[1]["error"]["code"], PARSE_ERROR);
        assert!(responses[1]["id"].is_null());
    }

    #[tokio::test]
    async fn dispatch_failure_becomes_an_internal_error_line() {
        struct Unreachable;

        #[async_trait::async_trait]
        impl SessionNamespace for Unreachable {
            fn id_from_name(&self, name: &str) -> SessionId {
                SessionId::from_name(name)
            }

            async fn get(&self, _id: &SessionId) -> Result<Arc<SessionStub>, DispatchError> {
                Err(DispatchError::Addressing {
                    name: "mcp-agent".into(),
                    reason: "namespace offline".into(),
                })
            }
        }

        let door = FrontDoor::new(Arc::new(Unreachable));
        let input = "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n";
        let mut output = Vec::new();

        serve_lines(&door, input.as_bytes(), &mut output).await.unwrap();

        let responses = response_lines(&output);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["error"]["code"], INTERNAL_ERROR);
    }
}
