// SPDX-License-Identifier: MIT

//! Mid-flight change spec: an input rewritten while its tool is running
//! triggers an immediate re-run once the result lands.

use crate::specs::prelude::*;
use serde_json::json;
use std::time::Duration;

#[test]
fn input_rewritten_during_the_run_is_rebuilt() {
    let project = Project::started();
    project.file("a.txt", b"v1");
    project.hub(
        "root.hub",
        &json!({
            "pipes": [
                { "tool": "gatedcopy",
                  "paths": [{"in": "{cur-dir}/a.txt", "out": "{cur-dir}/b.txt"}] }
            ]
        }),
    );
    project.add_hub("root.hub");

    // First run completes untouched and establishes the dependency.
    project.open_gate();
    assert!(wait_for(SPEC_WAIT_MAX_MS, || project.exists("b.txt")));
    let runs = project.runs();

    // Second run: dirty the input, let the tool read it and hold it at
    // the gate, then rewrite the input mid-flight.
    project.reset_gate();
    project.rewrite("a.txt", b"v2");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || project.gate_started()), "second run never started");
    project.rewrite("a.txt", b"v3");
    // Give the poll a moment to observe the newer write time.
    std::thread::sleep(Duration::from_millis(600));
    project.open_gate();

    // The result's pre-read time disagrees with the observed one, so the
    // pipe re-runs immediately and converges on the final content.
    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || project.read("b.txt") == b"v3"),
        "mid-flight change never converged"
    );
    assert!(project.runs() >= runs + 2, "expected a re-run after the mid-flight change");
}
