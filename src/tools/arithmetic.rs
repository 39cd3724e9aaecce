//! Arithmetic Tools
//!
//! `add` sums two numbers; `calculate` applies one of four operations. Dividing
//! by zero is not a failure: it answers with a normal result whose text says
//! so.

use schemars::JsonSchema;
use serde::Deserialize;

use crate::core::error::ToolError;
use crate::core::registry::{InvocationResult, ToolDefinition, ToolOutput, ToolRegistry};

pub const DIVIDE_BY_ZERO: &str = "Error: Cannot divide by zero";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddRequest {
    pub a: f64,
    pub b: f64,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CalculateRequest {
    pub operation: Operation,
    pub a: f64,
    pub b: f64,
}

pub fn add(a: f64, b: f64) -> f64 {
    a + b
}

pub fn calculate(operation: Operation, a: f64, b: f64) -> ToolOutput {
    match operation {
        Operation::Add => ToolOutput::Number(a + b),
        Operation::Subtract => ToolOutput::Number(a - b),
        Operation::Multiply => ToolOutput::Number(a * b),
        Operation::Divide if b == 0.0 => InvocationResult::text(DIVIDE_BY_ZERO).into(),
        Operation::Divide => ToolOutput::Number(a / b),
    }
}

/// Register `add` and `calculate` with the tool registry.
pub fn register(registry: &mut ToolRegistry) -> Result<(), ToolError> {
    registry.register(ToolDefinition::typed(
        "add",
        "Add two numbers.",
        |req: AddRequest| add(req.a, req.b),
    ))?;
    registry.register(ToolDefinition::typed(
        "calculate",
        "Apply add, subtract, multiply or divide to two numbers.",
        |req: CalculateRequest| calculate(req.operation, req.a, req.b),
    ))?;
    Ok(())
}
