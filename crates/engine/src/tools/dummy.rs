// SPDX-License-Identifier: MIT

use crate::tool::{PipeTool, ToolError, ToolInstr};
use forge_core::{format_elapsed_secs, time_to_millis};
use forge_probe::FileProbe as _;

/// Exercises the tool contract without doing real work: reads the input,
/// prints a report, and only copies when asked very insistently.
#[derive(Debug)]
pub struct Dummy;

impl PipeTool for Dummy {
    fn name(&self) -> &str {
        "dummy"
    }

    fn run(&self, instr: &mut ToolInstr) -> Result<(), ToolError> {
        let file_in = instr.file_in.clone();
        let file_out = instr.file_out.clone();

        let out_exists = instr.probe.exists(&file_out);
        let in_time = instr.probe.last_write_time(&file_in)?;
        let contents = instr.probe.read(&file_in)?;

        let age_secs = std::time::SystemTime::now()
            .duration_since(in_time)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        tracing::info!(
            file_in = %file_in.display(),
            bytes = contents.len(),
            age = %format_elapsed_secs(age_secs),
            in_mtime_ms = time_to_millis(in_time),
            out_exists,
            settings = %instr.settings,
            "dummy pipe tool"
        );

        // The magic words opt in to an actual copy.
        if instr.settings.get("special").and_then(|v| v.as_str())
            == Some("do it, you coward")
        {
            if let Some(parent) = file_out.parent() {
                instr.probe.create_directories(parent)?;
            }
            if out_exists {
                instr.probe.remove(&file_out)?;
            }
            instr.probe.copy(&file_in, &file_out)?;
        }

        Ok(())
    }
}
