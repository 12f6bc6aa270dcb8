// SPDX-License-Identifier: MIT

//! Process-wide tool registry

use crate::tool::PipeTool;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("the tool {0:?} is not known")]
pub struct UnknownTool(pub String);

/// Name → tool mapping, populated at init and read under a shared lock.
///
/// The registry is expected to be frozen once the wrangler starts; nothing
/// enforces that, but late registration only ever adds tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn PipeTool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tool: Arc<dyn PipeTool>) {
        let name = tool.name().to_string();
        tracing::debug!(tool = %name, "tool registered");
        self.tools.write().insert(name, tool);
    }

    pub fn find(&self, name: &str) -> Result<Arc<dyn PipeTool>, UnknownTool> {
        self.tools
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| UnknownTool(name.to_string()))
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
