//! Server Configuration
//!
//! Everything is read from environment variables once at startup:
//! - SERVER_NAME: Name of the server (default: "Authless Calculator")
//! - SERVER_VERSION: Version string (default: "1.0.0")
//! - MCP_TRANSPORT_MODE: "stdio", "http", or "both" (default: "both")
//! - HOST: Bind address for HTTP mode (default: "0.0.0.0")
//! - PORT: Port number for HTTP mode (default: 3000)
//! - WORKER_THREADS: HTTP worker count (default: CPU count, capped at 16)

use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

use crate::core::session::ServerInfo;

pub const DEFAULT_SERVER_NAME: &str = "Authless Calculator";
pub const DEFAULT_SERVER_VERSION: &str = "1.0.0";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
const MAX_WORKERS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Read from stdin, write to stdout. Used for MCP Inspector and local development.
    Stdio,
    /// Actix Web HTTP server.
    Http,
    /// STDIO and HTTP concurrently, sharing one session.
    Both,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid transport mode '{0}': must be 'stdio', 'http', or 'both'")]
pub struct InvalidTransportMode(String);

impl FromStr for TransportMode {
    type Err = InvalidTransportMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(TransportMode::Stdio),
            "http" => Ok(TransportMode::Http),
            "both" => Ok(TransportMode::Both),
            _ => Err(InvalidTransportMode(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Server name reported to clients (SERVER_NAME)
    pub name: String,
    /// Server version reported to clients (SERVER_VERSION)
    pub version: String,
    /// Which transports to run (MCP_TRANSPORT_MODE)
    pub transport: TransportMode,
    /// Bind address for HTTP mode (HOST)
    pub host: String,
    /// Port for HTTP mode (PORT)
    pub port: u16,
    /// HTTP worker thread count (WORKER_THREADS)
    pub workers: usize,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, InvalidTransportMode> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Arguments
    /// * `lookup` - Returns the value of an environment variable, if set
    pub fn from_lookup<F>(lookup: F) -> Result<Self, InvalidTransportMode>
    where
        F: Fn(&str) -> Option<String>,
    {
        let transport = match lookup("MCP_TRANSPORT_MODE") {
            Some(mode) => mode.parse()?,
            None => TransportMode::Both,
        };

        let port = match lookup("PORT") {
            Some(raw) => raw.parse::<u16>().unwrap_or_else(|_| {
                warn!(value = %raw, "invalid PORT, falling back to {}", DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        // Defaults to CPU count but capped to avoid excessive context switching
        let workers = lookup("WORKER_THREADS")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or_else(num_cpus::get)
            .clamp(1, MAX_WORKERS);

        Ok(Self {
            name: lookup("SERVER_NAME").unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string()),
            version: lookup("SERVER_VERSION").unwrap_or_else(|| DEFAULT_SERVER_VERSION.to_string()),
            transport,
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            workers,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }
}
