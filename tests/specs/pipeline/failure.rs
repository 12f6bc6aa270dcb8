// SPDX-License-Identifier: MIT

//! Tool failure specs: errors surface as retries on a backoff, not crashes.

use crate::specs::prelude::*;
use serde_json::json;
use std::time::Duration;

#[test]
fn failing_tool_backs_off_and_retries() {
    let project = Project::started();
    project.file("a.txt", b"payload");
    project.hub(
        "root.hub",
        &json!({
            "pipes": [
                { "tool": "alwaysfails",
                  "paths": [{"in": "{cur-dir}/a.txt", "out": "{cur-dir}/b.txt"}] }
            ]
        }),
    );
    project.add_hub("root.hub");

    // First attempt happens promptly.
    assert!(wait_for(SPEC_WAIT_MAX_MS, || project.runs() == 1), "first attempt never ran");

    // Inside the backoff window there is no second attempt.
    std::thread::sleep(Duration::from_millis(2000));
    assert_eq!(project.runs(), 1, "retried before the backoff elapsed");

    // Roughly four seconds after the failure it tries again.
    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || project.runs() >= 2),
        "the pipe was never retried"
    );
}

#[test]
fn unknown_tool_keeps_the_pipeline_alive() {
    let project = Project::started();
    project.file("a.txt", b"payload");
    project.file("real.txt", b"works");
    project.hub(
        "root.hub",
        &json!({
            "pipes": [
                { "tool": "no-such-tool",
                  "paths": [{"in": "{cur-dir}/a.txt", "out": "{cur-dir}/a.out"}] },
                { "tool": "copy",
                  "paths": [{"in": "{cur-dir}/real.txt", "out": "{cur-dir}/real.out"}] }
            ]
        }),
    );
    project.add_hub("root.hub");

    // The misconfigured pipe fails forever; the valid one still completes.
    assert!(wait_for(SPEC_WAIT_MAX_MS, || project.exists("real.out")));
    assert!(!project.exists("a.out"));
}
