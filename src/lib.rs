//! Authless calculator MCP server.
//!
//! Two arithmetic tools, `add` and `calculate`, served from a single
//! long-lived MCP session over HTTP and STDIO.

pub mod core;
pub mod tools;

pub use crate::core::config::{ServerConfig, TransportMode};
pub use crate::core::dispatch::{FrontDoor, LocalNamespace, SESSION_NAME, SessionNamespace};
pub use crate::core::error::{DispatchError, ToolError, ValidationError};
pub use crate::core::registry::{InvocationResult, ToolDefinition, ToolRegistry};
pub use crate::core::session::{McpSession, ServerInfo};
pub use crate::core::validator::{JsonSchemaValidator, Validator};
