// SPDX-License-Identifier: MIT

//! Single pipe copy specs
//!
//! A root hub with one copy pipe: the output appears, matches the input,
//! and an unchanged input never re-runs the tool.

use crate::specs::prelude::*;
use serde_json::json;

fn copy_hub(project: &Project) {
    project.hub(
        "root.hub",
        &json!({
            "pipes": [
                { "tool": "copy",
                  "paths": [{"in": "{cur-dir}/a.txt", "out": "{cur-dir}/b.txt"}] }
            ]
        }),
    );
}

#[test]
fn output_is_produced_and_matches_input() {
    let project = Project::started();
    project.file("a.txt", b"payload");
    copy_hub(&project);
    project.add_hub("root.hub");

    assert!(wait_for(SPEC_WAIT_MAX_MS, || project.exists("b.txt")), "b.txt never appeared");
    assert_eq!(project.read("b.txt"), b"payload");
}

#[test]
fn second_pass_with_no_change_runs_nothing() {
    let project = Project::started();
    project.file("a.txt", b"payload");
    copy_hub(&project);
    project.add_hub("root.hub");

    assert!(wait_for(SPEC_WAIT_MAX_MS, || project.exists("b.txt")));
    let runs = project.runs();
    assert_eq!(runs, 1);

    // Several full poll cycles with nothing changed.
    std::thread::sleep(std::time::Duration::from_millis(1500));
    assert_eq!(project.runs(), runs, "an unchanged input re-ran the pipe");
}

#[test]
fn editing_the_input_rebuilds_the_output() {
    let project = Project::started();
    project.file("a.txt", b"one");
    copy_hub(&project);
    project.add_hub("root.hub");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || project.exists("b.txt")));

    project.rewrite("a.txt", b"two");
    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || project.read("b.txt") == b"two"),
        "edit never propagated to the output"
    );
}
