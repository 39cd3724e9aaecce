//! Error Types
//!
//! Tool-level failures are reported by the registry and turned into JSON-RPC
//! errors by the session's protocol layer. Dispatch failures happen before a
//! session is reached and are mapped to HTTP 500 by the transport.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

/// Arguments did not conform to a tool's parameter shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid arguments for tool '{tool}': {}", .messages.join("; "))]
pub struct ValidationError {
    pub tool: String,
    pub messages: Vec<String>,
}

impl ValidationError {
    pub fn new(tool: impl Into<String>, messages: Vec<String>) -> Self {
        Self {
            tool: tool.into(),
            messages,
        }
    }
}

/// Errors raised while registering or invoking tools.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },
    #[error("Tool already registered: {name}")]
    DuplicateTool { name: String },
}

/// Errors raised by the front door while resolving a session.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to create session {id}: {source}")]
    Creation {
        id: String,
        #[source]
        source: ToolError,
    },
    #[error("failed to address session '{name}': {reason}")]
    Addressing { name: String, reason: String },
}

impl ResponseError for DispatchError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::InternalServerError().json(serde_json::json!({
            "error": "internal server error",
            "detail": self.to_string(),
        }))
    }
}
