// SPDX-License-Identifier: MIT

//! Warm-start specs: persistence reload and hub re-parenting.

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
fn warm_start_with_unchanged_inputs_rebuilds_nothing() {
    let mut project = Project::started();
    project.file("a.txt", b"payload");
    copy_hub(&project);
    project.add_hub("root.hub");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || project.exists("b.txt")));

    // Let the monitor settle and persist, then "restart the daemon".
    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || {
            forge_storage::load(&project.path("persist"))
                .ok()
                .flatten()
                .is_some_and(|s| !s.pipes.is_empty())
        }),
        "settled state never reached disk"
    );
    let runs = project.runs();
    project.restart_monitor();
    project.add_hub("root.hub");

    // The reloaded pipe is reclaimed by the hub with its dependency set
    // intact; give the loop ample time to prove it stays quiet.
    std::thread::sleep(std::time::Duration::from_millis(1500));
    assert_eq!(project.runs(), runs, "a warm start rebuilt an unchanged pipe");
    assert_eq!(project.read("b.txt"), b"payload");
}

#[test]
fn warm_start_rebuilds_only_what_changed_while_down() {
    let mut project = Project::started();
    project.file("a.txt", b"old");
    project.file("c.txt", b"constant");
    project.hub(
        "root.hub",
        &json!({
            "pipes": [
                { "tool": "copy",
                  "paths": [
                      {"in": "{cur-dir}/a.txt", "out": "{cur-dir}/a.out"},
                      {"in": "{cur-dir}/c.txt", "out": "{cur-dir}/c.out"}
                  ] }
            ]
        }),
    );
    project.add_hub("root.hub");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || {
        project.exists("a.out") && project.exists("c.out")
    }));
    assert!(wait_for(SPEC_WAIT_MAX_MS, || {
        forge_storage::load(&project.path("persist"))
            .ok()
            .flatten()
            .is_some_and(|s| s.pipes.len() == 2)
    }));

    project.monitor.end_and_wait();
    project.rewrite("a.txt", b"new");
    let runs = project.runs();

    project.restart_monitor();
    project.add_hub("root.hub");

    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || project.read("a.out") == b"new"),
        "the changed input never rebuilt"
    );
    // One rebuild for a.txt; c.txt stayed warm.
    std::thread::sleep(std::time::Duration::from_millis(1000));
    assert_eq!(project.runs(), runs + 1, "the unchanged pipe rebuilt too");
}
