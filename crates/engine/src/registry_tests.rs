// SPDX-License-Identifier: MIT

use super::*;
use crate::tool::{ToolError, ToolInstr};

#[derive(Debug)]
struct Nop(&'static str);

impl PipeTool for Nop {
    fn name(&self) -> &str {
        self.0
    }

    fn run(&self, _instr: &mut ToolInstr) -> Result<(), ToolError> {
        Ok(())
    }
}

#[test]
fn find_returns_registered_tool() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(Nop("copy")));
    assert_eq!(registry.find("copy").unwrap().name(), "copy");
}

#[test]
fn find_unknown_tool_fails_with_its_name() {
    let registry = ToolRegistry::new();
    let err = registry.find("nope").unwrap_err();
    assert_eq!(err, UnknownTool("nope".to_string()));
}

#[test]
fn names_are_sorted() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(Nop("zeta")));
    registry.register(Arc::new(Nop("alpha")));
    assert_eq!(registry.names(), vec!["alpha".to_string(), "zeta".to_string()]);
}

#[test]
fn re_registering_replaces() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(Nop("copy")));
    registry.register(Arc::new(Nop("copy")));
    assert_eq!(registry.names().len(), 1);
}
