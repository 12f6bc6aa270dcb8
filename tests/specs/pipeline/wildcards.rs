// SPDX-License-Identifier: MIT

//! Wildcard fan-out specs

use crate::specs::prelude::*;
use serde_json::json;

fn wildcard_hub(project: &Project) {
    project.hub(
        "root.hub",
        &json!({
            "pipes": [
                { "tool": "copy",
                  "paths": [{"in": "{cur-dir}/src/~name~.txt", "out": "{cur-dir}/dst/~name~.out"}] }
            ]
        }),
    );
}

#[test]
fn each_match_becomes_a_pipe() {
    let project = Project::started();
    project.file("src/one.txt", b"1");
    project.file("src/two.txt", b"2");
    wildcard_hub(&project);
    project.add_hub("root.hub");

    assert!(wait_for(SPEC_WAIT_MAX_MS, || {
        project.exists("dst/one.out") && project.exists("dst/two.out")
    }));
    assert_eq!(project.read("dst/one.out"), b"1");
    assert_eq!(project.read("dst/two.out"), b"2");
    assert_eq!(project.runs(), 2, "exactly one run per matched file");
}

#[test]
fn a_new_matching_file_spawns_a_new_pipe() {
    let project = Project::started();
    project.file("src/one.txt", b"1");
    project.file("src/two.txt", b"2");
    wildcard_hub(&project);
    project.add_hub("root.hub");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || {
        project.exists("dst/one.out") && project.exists("dst/two.out")
    }));

    project.file("src/three.txt", b"3");
    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || project.exists("dst/three.out")),
        "the third pipe never fired"
    );
    assert_eq!(project.read("dst/three.out"), b"3");
}
