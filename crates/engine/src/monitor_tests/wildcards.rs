// SPDX-License-Identifier: MIT

//! Wildcard pipes: fan-out, late additions and capture-driven settings.

use super::Rig;
use serde_json::json;

fn wildcard_hub(rig: &Rig) {
    rig.write_hub(
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
fn wildcard_fans_out_to_one_pipe_per_match() {
    let rig = Rig::new();
    rig.write("src/one.txt", b"1");
    rig.write("src/two.txt", b"2");
    wildcard_hub(&rig);
    rig.add_hub("root.hub");

    rig.wait_until(|r| r.exists("dst/one.out") && r.exists("dst/two.out"));
    rig.settle();

    assert_eq!(rig.read("dst/one.out"), b"1");
    assert_eq!(rig.read("dst/two.out"), b"2");
    assert_eq!(rig.monitor.with_state(|s| s.store.pipes.len()), 2, "exactly two pipes");
    rig.check_invariants();
}

#[test]
fn adding_a_matching_file_spawns_a_third_pipe() {
    let rig = Rig::new();
    rig.write("src/one.txt", b"1");
    rig.write("src/two.txt", b"2");
    wildcard_hub(&rig);
    rig.add_hub("root.hub");
    rig.wait_until(|r| r.exists("dst/one.out") && r.exists("dst/two.out"));
    rig.settle();

    rig.write("src/three.txt", b"3");
    rig.wait_until(|r| r.exists("dst/three.out"));
    rig.settle();

    assert_eq!(rig.read("dst/three.out"), b"3");
    assert_eq!(rig.monitor.with_state(|s| s.store.pipes.len()), 3);
}

#[test]
fn removing_a_matching_file_keeps_existing_outputs() {
    let rig = Rig::new();
    rig.write("src/one.txt", b"1");
    rig.write("src/two.txt", b"2");
    wildcard_hub(&rig);
    rig.add_hub("root.hub");
    rig.wait_until(|r| r.exists("dst/one.out") && r.exists("dst/two.out"));
    rig.settle();
    let runs = rig.runs();

    std::fs::remove_file(rig.path("src/two.txt")).unwrap();
    rig.cycles(3);
    rig.settle();

    // The matched set changed and the wildcard re-expanded, but the
    // surviving pipe had nothing to rebuild.
    assert_eq!(rig.runs(), runs);
    assert!(rig.exists("dst/two.out"));
}

#[test]
fn capture_bindings_feed_settings_interpolation() {
    let rig = Rig::new();
    rig.write("src/alpha.txt", b"a");
    rig.write_hub(
        "root.hub",
        &json!({
            "pipes": [
                { "tool": "dummy",
                  "settings": {"label": "item-{name}"},
                  "paths": [{"in": "{cur-dir}/src/~name~.txt", "out": "{cur-dir}/dst/~name~.out"}] }
            ]
        }),
    );
    rig.add_hub("root.hub");
    rig.wait_until(|r| r.monitor.with_state(|s| !s.store.pipes.is_empty()));
    rig.settle();

    rig.monitor.with_state(|state| {
        let pipe = state.store.pipes.values().next().unwrap();
        assert_eq!(pipe.settings["label"], "item-alpha");
        assert!(pipe.base_out.ends_with("dst/alpha.out"));
    });
}

#[test]
fn wildcard_pipes_rebuild_when_their_input_changes() {
    let rig = Rig::new();
    rig.write("src/one.txt", b"1");
    wildcard_hub(&rig);
    rig.add_hub("root.hub");
    rig.wait_until(|r| r.exists("dst/one.out"));
    rig.settle();
    let runs = rig.runs();

    rig.rewrite("src/one.txt", b"updated");
    rig.wait_until(|r| r.runs() > runs);
    rig.settle();
    assert_eq!(rig.read("dst/one.out"), b"updated");
}
