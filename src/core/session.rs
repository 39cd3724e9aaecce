//! MCP Session
//!
//! A session owns one tool registry, built exactly once when the session is
//! constructed, and answers MCP requests against it for its whole lifetime.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::core::error::ToolError;
use crate::core::protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, InvocationRequest, MCPError, MCPRequest, MCPResponse,
    METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION,
};
use crate::core::registry::ToolRegistry;
use crate::core::validator::Validator;

/// Server metadata reported in `initialize` responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server name as reported in MCP initialize responses
    pub name: String,
    /// Server version string as reported in MCP initialize responses
    pub version: String,
}

/// Long-lived MCP session addressed by a logical name.
pub struct McpSession {
    /// Metadata returned from `initialize`
    info: ServerInfo,
    /// Tools offered by this session, fixed after construction
    registry: ToolRegistry,
}

impl McpSession {
    /// Build a session, running `build` once to populate its registry.
    ///
    /// # Arguments
    /// * `info` - Server name and version for `initialize` responses
    /// * `validator` - Checks tool arguments before any handler runs
    /// * `build` - Registers the session's tools; called exactly once
    ///
    /// # Errors
    ///
    /// Whatever `build` returns, typically [`ToolError::DuplicateTool`].
    pub fn new<F>(info: ServerInfo, validator: Arc<dyn Validator>, build: F) -> Result<Self, ToolError>
    where
        F: FnOnce(&mut ToolRegistry) -> Result<(), ToolError>,
    {
        let mut registry = ToolRegistry::new(validator);
        build(&mut registry)?;
        debug!(server = %info.name, tools = registry.len(), "session initialized");
        Ok(Self { info, registry })
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Parse a raw JSON-RPC message and answer it.
    ///
    /// Text that is not JSON gets `-32700`. Valid JSON that is not a single
    /// request object (a batch, a missing `method`) gets `-32600`, echoing the
    /// id when one can be read. Returns `None` for notifications.
    pub fn handle_raw(&self, raw: &[u8]) -> Option<MCPResponse> {
        let value = match serde_json::from_slice::<Value>(raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "unparsable request");
                return Some(MCPResponse::failure(
                    None,
                    MCPError::new(PARSE_ERROR, format!("Parse error: {err}")),
                ));
            }
        };

        let id = value.get("id").cloned();
        match serde_json::from_value::<MCPRequest>(value) {
            Ok(request) => self.handle(request),
            Err(err) => {
                warn!(error = %err, "malformed request");
                Some(MCPResponse::failure(
                    id,
                    MCPError::new(INVALID_REQUEST, format!("Invalid Request: {err}")),
                ))
            }
        }
    }

    /// Answer an already parsed request. Returns `None` for notifications.
    pub fn handle(&self, request: MCPRequest) -> Option<MCPResponse> {
        if request.is_notification() {
            debug!(method = %request.method, "notification received");
            return None;
        }

        let id = request.id;
        if id.as_ref().is_some_and(Value::is_null) {
            return Some(MCPResponse::failure(
                id,
                MCPError::new(INVALID_REQUEST, "Invalid Request: id must not be null"),
            ));
        }
        if request.jsonrpc != "2.0" {
            return Some(MCPResponse::failure(
                id,
                MCPError::new(INVALID_REQUEST, "Invalid Request: jsonrpc must be \"2.0\""),
            ));
        }

        let response = match request.method.as_str() {
            "initialize" => MCPResponse::success(id, self.initialize_result()),
            "ping" => MCPResponse::success(id, json!({})),
            "tools/list" => MCPResponse::success(id, self.tools_list_result()),
            "tools/call" => self.call_tool(id, request.params),
            other => MCPResponse::failure(
                id,
                MCPError::new(METHOD_NOT_FOUND, format!("Method not found: {other}")),
            ),
        };
        Some(response)
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": self.info.name,
                "version": self.info.version
            }
        })
    }

    fn tools_list_result(&self) -> Value {
        let tools: Vec<Value> = self.registry.tools().map(|tool| tool.describe()).collect();
        json!({ "tools": tools })
    }

    fn call_tool(&self, id: Option<Value>, params: Option<Value>) -> MCPResponse {
        let Some(params) = params else {
            return MCPResponse::failure(id, MCPError::new(INVALID_PARAMS, "Invalid params"));
        };
        let call: InvocationRequest = match serde_json::from_value(params) {
            Ok(call) => call,
            Err(err) => {
                return MCPResponse::failure(
                    id,
                    MCPError::new(INVALID_PARAMS, format!("Invalid params: {err}")),
                );
            }
        };

        match self.registry.invoke(&call.tool_name, call.arguments) {
            Ok(result) => match serde_json::to_value(&result) {
                Ok(value) => MCPResponse::success(id, value),
                Err(err) => MCPResponse::failure(
                    id,
                    MCPError::new(INTERNAL_ERROR, format!("unserializable result: {err}")),
                ),
            },
            Err(err) => {
                debug!(tool = %call.tool_name, error = %err, "tool call rejected");
                MCPResponse::failure(id, tool_error_to_rpc(err))
            }
        }
    }
}

fn tool_error_to_rpc(err: ToolError) -> MCPError {
    match err {
        ToolError::Validation(validation) => {
            let data = json!({ "tool": validation.tool, "errors": validation.messages });
            MCPError::new(INVALID_PARAMS, validation.to_string()).with_data(data)
        }
        ToolError::UnknownTool { .. } => MCPError::new(METHOD_NOT_FOUND, err.to_string()),
        ToolError::DuplicateTool { .. } => MCPError::new(INTERNAL_ERROR, err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::ToolDefinition;
    use crate::core::validator::JsonSchemaValidator;
    use crate::tools;

    fn session() -> McpSession {
        McpSession::new(
            ServerInfo {
                name: "Authless Calculator".into(),
                version: "1.0.0".into(),
            },
            Arc::new(JsonSchemaValidator),
            tools::register_all,
        )
        .unwrap()
    }

    fn call(session: &McpSession, body: Value) -> Value {
        let response = session.handle_raw(body.to_string().as_bytes()).unwrap();
        serde_json::to_value(response).unwrap()
    }

    #[test]
    fn builder_runs_exactly_once() {
        let mut runs = 0;
        let session = McpSession::new(
            ServerInfo {
                name: "t".into(),
                version: "0".into(),
            },
            Arc::new(JsonSchemaValidator),
            |registry| {
                runs += 1;
                tools::register_all(registry)
            },
        )
        .unwrap();
        assert_eq!(runs, 1);
        assert_eq!(session.registry().tool_names(), vec!["add", "calculate"]);
    }

    #[test]
    fn failing_builder_fails_construction() {
        let result = McpSession::new(
            ServerInfo {
                name: "t".into(),
                version: "0".into(),
            },
            Arc::new(JsonSchemaValidator),
            |registry| {
                tools::register_all(registry)?;
                registry.register(ToolDefinition::typed(
                    "add",
                    "again",
                    |req: tools::arithmetic::AddRequest| req.a,
                ))
            },
        );
        assert!(matches!(result, Err(ToolError::DuplicateTool { name }) if name == "add"));
    }

    #[test]
    fn initialize_reports_server_info() {
        let resp = call(
            &session(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        );
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(resp["result"]["serverInfo"]["name"], "Authless Calculator");
        assert!(resp["result"]["capabilities"]["tools"].is_object());
    }

    #[test]
    fn tools_list_describes_both_tools() {
        let resp = call(&session(), json!({"jsonrpc": "2.0", "id": "l", "method": "tools/list"}));
        let tools = resp["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0]["name"], "add");
        assert_eq!(tools[1]["name"], "calculate");
        assert_eq!(tools[1]["inputSchema"]["type"], "object");
    }

    #[test]
    fn tools_call_returns_text_content() {
        let resp = call(
            &session(),
            json!({
                "jsonrpc": "2.0", "id": 2, "method": "tools/call",
                "params": {"name": "calculate", "arguments": {"operation": "divide", "a": 10, "b": 0}}
            }),
        );
        assert_eq!(
            resp["result"],
            json!({"content": [{"type": "text", "text": "Error: Cannot divide by zero"}], "isError": false})
        );
        assert!(resp.get("error").is_none());
    }

    #[test]
    fn unknown_tool_is_a_protocol_error() {
        let resp = call(
            &session(),
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "sqrt", "arguments": {}}}),
        );
        assert_eq!(resp["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(resp["error"]["message"], "Unknown tool: sqrt");
        assert!(resp.get("result").is_none());
    }

    #[test]
    fn invalid_arguments_are_a_protocol_error() {
        let resp = call(
            &session(),
            json!({
                "jsonrpc": "2.0", "id": 4, "method": "tools/call",
                "params": {"name": "calculate", "arguments": {"operation": "add", "a": 1}}
            }),
        );
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
        assert_eq!(resp["error"]["data"]["tool"], "calculate");
    }

    #[test]
    fn missing_params_are_rejected() {
        let resp = call(&session(), json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call"}));
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
    }

    #[test]
    fn notifications_get_no_response() {
        let raw = br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        assert!(session().handle_raw(raw).is_none());
    }

    #[test]
    fn garbage_yields_parse_error() {
        let resp = session().handle_raw(b"{not json").unwrap();
        assert_eq!(resp.error.unwrap().code, PARSE_ERROR);
        assert!(resp.id.is_none());
    }

    #[test]
    fn valid_json_that_is_not_a_request_is_invalid_request() {
        let resp = call(&session(), json!({"jsonrpc": "2.0", "id": 9}));
        assert_eq!(resp["error"]["code"], INVALID_REQUEST);
        assert_eq!(resp["id"], 9);

        let batch = json!([{"jsonrpc": "2.0", "id": 10, "method": "ping"}]);
        let resp = call(&session(), batch);
        assert_eq!(resp["error"]["code"], INVALID_REQUEST);
        assert!(resp["id"].is_null());
    }

    #[test]
    fn null_id_is_rejected_not_dropped() {
        let resp = call(&session(), json!({"jsonrpc": "2.0", "id": null, "method": "ping"}));
        assert_eq!(resp["error"]["code"], INVALID_REQUEST);
        assert!(resp["id"].is_null());
        assert!(resp.get("result").is_none());
    }

    #[test]
    fn wrong_version_and_unknown_method() {
        let resp = call(&session(), json!({"jsonrpc": "1.0", "id": 6, "method": "ping"}));
        assert_eq!(resp["error"]["code"], INVALID_REQUEST);

        let resp = call(&session(), json!({"jsonrpc": "2.0", "id": 7, "method": "resources/list"}));
        assert_eq!(resp["error"]["code"], METHOD_NOT_FOUND);

        let resp = call(&session(), json!({"jsonrpc": "2.0", "id": 8, "method": "ping"}));
        assert_eq!(resp["result"], json!({}));
    }
}
