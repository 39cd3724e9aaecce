//! Tool Registry
//!
//! Binds a tool name, its parameter shape and a handler into a callable unit.
//! Tools are registered once while a session is built and are read-only after
//! that, so the registry carries no locking of its own.

use std::sync::Arc;

use indexmap::IndexMap;
use schemars::{JsonSchema, generate::SchemaSettings};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;

use crate::core::error::{ToolError, ValidationError};
use crate::core::validator::{PreparedShape, Validator};

/// A single block of tool output. Only text blocks are produced here.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

/// Result of a successful tool invocation.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    /// Ordered content blocks; always a single text block here
    pub content: Vec<ContentBlock>,
    /// Always false: tool-level failures are JSON-RPC errors instead
    pub is_error: bool,
}

impl InvocationResult {
    /// Success-shaped result carrying a single text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Text of the first content block.
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|block| match block {
            ContentBlock::Text { text } => text.as_str(),
        })
    }
}

/// What a handler hands back to the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Rendered into a single text block by the registry.
    Number(f64),
    /// Already shaped; passed through untouched.
    Result(InvocationResult),
}

impl From<f64> for ToolOutput {
    fn from(value: f64) -> Self {
        ToolOutput::Number(value)
    }
}

impl From<InvocationResult> for ToolOutput {
    fn from(result: InvocationResult) -> Self {
        ToolOutput::Result(result)
    }
}

/// Tool handler function type definition.
///
/// Handlers receive the validated argument bag and run synchronously.
pub type ToolHandler = Box<dyn Fn(Value) -> Result<ToolOutput, ToolError> + Send + Sync>;

/// A named tool with its parameter shape and handler.
pub struct ToolDefinition {
    /// Unique tool identifier within a registry (e.g., "add", "calculate")
    pub name: String,
    /// Human-readable description shown to clients in tools/list
    pub description: String,
    /// JSON Schema describing every field the handler reads
    pub parameter_shape: Value,
    /// Runs the tool on an already validated argument bag
    handler: ToolHandler,
}

impl ToolDefinition {
    /// Create a tool from an explicit shape and handler.
    ///
    /// # Arguments
    /// * `name` - Unique tool name
    /// * `description` - What the tool does, for discovery
    /// * `parameter_shape` - JSON Schema for the argument bag
    /// * `handler` - Function that executes the tool when called
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameter_shape: Value,
        handler: ToolHandler,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameter_shape,
            handler,
        }
    }

    /// Build a tool whose parameter shape is derived from `A`.
    ///
    /// The shape and the handler's argument type come from the same struct,
    /// so the shape always covers every field the handler reads.
    ///
    /// # Arguments
    /// * `name` - Unique tool name
    /// * `description` - What the tool does, for discovery
    /// * `f` - Computes the result from the deserialized arguments
    pub fn typed<A, O, F>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        A: JsonSchema + DeserializeOwned + 'static,
        O: Into<ToolOutput> + 'static,
        F: Fn(A) -> O + Send + Sync + 'static,
    {
        let name = name.into();
        let tool = name.clone();
        let handler: ToolHandler = Box::new(move |arguments: Value| {
            let args: A = serde_json::from_value(arguments)
                .map_err(|err| ValidationError::new(tool.clone(), vec![err.to_string()]))?;
            Ok(f(args).into())
        });
        Self::new(name, description, parameter_shape_for::<A>(), handler)
    }

    /// Discovery view used by `tools/list`.
    pub fn describe(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.parameter_shape,
        })
    }
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameter_shape", &self.parameter_shape)
            .finish_non_exhaustive()
    }
}

/// Generate an inline draft-07 JSON Schema for a parameter struct.
pub fn parameter_shape_for<A: JsonSchema>() -> Value {
    let settings = SchemaSettings::draft07().with(|s| s.inline_subschemas = true);
    let mut shape = settings.into_generator().into_root_schema_for::<A>().to_value();
    if let Value::Object(map) = &mut shape {
        map.remove("$schema");
        map.remove("title");
    }
    shape
}

/// A tool together with its shape, prepared once at registration.
struct RegisteredTool {
    definition: ToolDefinition,
    shape: Arc<dyn PreparedShape>,
}

/// Registry of available MCP tools, in registration order.
pub struct ToolRegistry {
    /// Registered tools keyed by name (for tools/list and tools/call)
    tools: IndexMap<String, RegisteredTool>,
    /// Prepares each tool's parameter shape when it is registered
    validator: Arc<dyn Validator>,
}

impl ToolRegistry {
    /// Create an empty registry.
    ///
    /// # Arguments
    /// * `validator` - Checks argument bags against each tool's parameter shape
    pub fn new(validator: Arc<dyn Validator>) -> Self {
        Self {
            tools: IndexMap::new(),
            validator,
        }
    }

    /// Install a tool and prepare its parameter shape.
    ///
    /// # Errors
    ///
    /// [`ToolError::DuplicateTool`] if the name is already taken, and
    /// [`ToolError::Validation`] if the validator cannot use the shape.
    pub fn register(&mut self, definition: ToolDefinition) -> Result<(), ToolError> {
        if self.tools.contains_key(&definition.name) {
            return Err(ToolError::DuplicateTool {
                name: definition.name,
            });
        }
        let shape = self
            .validator
            .prepare(&definition.parameter_shape)
            .map_err(|messages| ValidationError::new(definition.name.clone(), messages))?;
        debug!(tool = %definition.name, "registered tool");
        self.tools
            .insert(definition.name.clone(), RegisteredTool { definition, shape });
        Ok(())
    }

    /// Validate `arguments` and run the named tool.
    ///
    /// # Arguments
    /// * `name` - Tool name from the `tools/call` request
    /// * `arguments` - Argument bag, checked against the tool's shape first
    ///
    /// # Errors
    ///
    /// [`ToolError::UnknownTool`] if nothing is registered under `name`, and
    /// [`ToolError::Validation`] if the arguments do not fit the tool's shape.
    /// Neither case reaches the handler.
    pub fn invoke(&self, name: &str, arguments: Value) -> Result<InvocationResult, ToolError> {
        let tool = self.tools.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_string(),
        })?;

        tool.shape
            .check(&arguments)
            .map_err(|messages| ValidationError::new(name, messages))?;

        let output = (tool.definition.handler)(arguments)?;
        Ok(match output {
            ToolOutput::Number(value) => InvocationResult::text(format_number(value)),
            ToolOutput::Result(result) => result,
        })
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name).map(|tool| &tool.definition)
    }

    pub fn tools(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.values().map(|tool| &tool.definition)
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Render a number the way MCP clients of this service expect to read it.
///
/// Integral values drop the fractional part, `-0` prints as `0`, non-finite
/// values print as `Infinity`/`-Infinity`/`NaN`, and very large or very small
/// magnitudes switch to exponent form (`1e+21`, `1.5e-7`).
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let exp = format!("{value:e}");
        match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
            _ => exp,
        }
    } else {
        value.to_string()
    }
}
