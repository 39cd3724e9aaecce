//! Tools Module
//!
//! Each tool family lives in its own module and exports a `register` function
//! that installs its tools while a session is being built.

pub mod arithmetic;

use crate::core::error::ToolError;
use crate::core::registry::ToolRegistry;

/// Install every tool this server offers.
pub fn register_all(registry: &mut ToolRegistry) -> Result<(), ToolError> {
    arithmetic::register(registry)
}
