// SPDX-License-Identifier: MIT

//! Built-in pipe tools

mod dummy;
mod smartcopy;

pub use dummy::Dummy;
pub use smartcopy::SmartCopy;

use crate::registry::ToolRegistry;
use std::sync::Arc;

/// Register every built-in tool.
pub fn register_builtins(registry: &ToolRegistry) {
    registry.register(Arc::new(SmartCopy));
    registry.register(Arc::new(Dummy));
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
