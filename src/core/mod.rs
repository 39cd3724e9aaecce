//! Core Server Framework Module
//!
//! - protocol.rs: JSON-RPC 2.0 envelopes
//! - validator.rs: argument validation against parameter shapes
//! - registry.rs: tool definitions and the tool registry
//! - session.rs: the long-lived MCP session and its protocol layer
//! - dispatch.rs: session addressing and the front door
//! - server.rs: HTTP and STDIO transports
//! - config.rs: environment configuration

pub mod config;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod validator;
