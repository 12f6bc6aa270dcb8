// SPDX-License-Identifier: MIT

use crate::tool::{PipeTool, ToolError, ToolInstr};
use forge_probe::FileProbe as _;

/// Copies the input to the output, replacing any stale output file.
#[derive(Debug)]
pub struct SmartCopy;

impl PipeTool for SmartCopy {
    fn name(&self) -> &str {
        "smartcopy"
    }

    fn run(&self, instr: &mut ToolInstr) -> Result<(), ToolError> {
        let file_in = instr.file_in.clone();
        let file_out = instr.file_out.clone();

        if let Some(parent) = file_out.parent() {
            instr.probe.create_directories(parent)?;
        }
        if instr.probe.exists(&file_out) {
            instr.probe.remove(&file_out)?;
        }
        instr.probe.copy(&file_in, &file_out)?;
        Ok(())
    }
}
