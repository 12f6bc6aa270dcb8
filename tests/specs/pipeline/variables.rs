// SPDX-License-Identifier: MIT

//! Variable expansion specs

use crate::specs::prelude::*;
use serde_json::json;

#[test]
fn variables_expand_in_pipe_paths() {
    let project = Project::started();
    project.file("x.png", b"img");
    project.hub(
        "root.hub",
        &json!({
            "vars": [{"ext": "png"}],
            "pipes": [
                { "tool": "copy",
                  "paths": [{"in": "{cur-dir}/x.{ext}", "out": "{cur-dir}/out/x.{ext}"}] }
            ]
        }),
    );
    project.add_hub("root.hub");

    assert!(wait_for(SPEC_WAIT_MAX_MS, || project.exists("out/x.png")));
    assert_eq!(project.read("out/x.png"), b"img");
}

#[test]
fn nested_definitions_expand_through_each_other() {
    let project = Project::started();
    project.file("v.txt", b"data");
    project.hub(
        "root.hub",
        &json!({
            "vars": [{"a": "v"}, {"b": "{a}"}],
            "pipes": [
                { "tool": "copy",
                  "paths": [{"in": "{cur-dir}/{b}.txt", "out": "{cur-dir}/{b}.out"}] }
            ]
        }),
    );
    project.add_hub("root.hub");

    assert!(wait_for(SPEC_WAIT_MAX_MS, || project.exists("v.out")));
    assert_eq!(project.read("v.out"), b"data");
}

#[test]
fn settings_are_interpolated_per_pipe() {
    let project = Project::started();
    project.file("a.txt", b"data");
    project.hub(
        "root.hub",
        &json!({
            "vars": [{"mode": "do it, you coward"}],
            "pipes": [
                { "tool": "dummy",
                  "settings": {"special": "{mode}"},
                  "paths": [{"in": "{cur-dir}/a.txt", "out": "{cur-dir}/a.out"}] }
            ]
        }),
    );
    project.add_hub("root.hub");

    // The dummy tool only copies when the interpolated magic words arrive.
    assert!(wait_for(SPEC_WAIT_MAX_MS, || project.exists("a.out")));
    assert_eq!(project.read("a.out"), b"data");
}
