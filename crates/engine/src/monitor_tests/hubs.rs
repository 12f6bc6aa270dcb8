// SPDX-License-Identifier: MIT

//! Hub interpretation: variables, groups, child hubs, orphan cleanup and
//! malformed manifests.

use super::Rig;
use forge_core::Clock;
use serde_json::json;
use std::time::Duration;

#[test]
fn variable_expansion_reaches_pipe_paths() {
    let rig = Rig::new();
    rig.write("x.png", b"img");
    rig.write_hub(
        "root.hub",
        &json!({
            "vars": [{"ext": "png"}],
            "pipes": [
                { "tool": "copy",
                  "paths": [{"in": "{cur-dir}/x.{ext}", "out": "{cur-dir}/out/x.{ext}"}] }
            ]
        }),
    );
    rig.add_hub("root.hub");
    rig.wait_until(|r| r.exists("out/x.png"));
    rig.settle();
    assert_eq!(rig.read("out/x.png"), b"img");
}

#[test]
fn nested_variable_definitions_expand() {
    let rig = Rig::new();
    rig.write("v.txt", b"data");
    rig.write_hub(
        "root.hub",
        &json!({
            "vars": [{"a": "v"}, {"b": "{a}"}],
            "pipes": [
                { "tool": "copy",
                  "paths": [{"in": "{cur-dir}/{b}.txt", "out": "{cur-dir}/{b}.out"}] }
            ]
        }),
    );
    rig.add_hub("root.hub");
    rig.wait_until(|r| r.exists("v.out"));
    rig.settle();
}

#[test]
fn groups_scope_their_variables() {
    let rig = Rig::new();
    rig.write("one.txt", b"1");
    rig.write("two.txt", b"2");
    rig.write_hub(
        "root.hub",
        &json!({
            "vars": [{"name": "one"}],
            "groups": [
                {
                    "vars": [{"name": "two"}],
                    "pipes": [
                        { "tool": "copy",
                          "paths": [{"in": "{cur-dir}/{name}.txt", "out": "{cur-dir}/{name}.out"}] }
                    ]
                }
            ],
            "pipes": [
                { "tool": "copy",
                  "paths": [{"in": "{cur-dir}/{name}.txt", "out": "{cur-dir}/{name}.out"}] }
            ]
        }),
    );
    rig.add_hub("root.hub");
    rig.wait_until(|r| r.exists("one.out") && r.exists("two.out"));
    rig.settle();
    assert_eq!(rig.read("one.out"), b"1");
    assert_eq!(rig.read("two.out"), b"2");
}

#[test]
fn child_hub_is_discovered_and_interpreted() {
    let rig = Rig::new();
    rig.write("sub/in.txt", b"payload");
    rig.write_hub(
        "sub/child.hub",
        &json!({
            "pipes": [
                { "tool": "copy",
                  "paths": [{"in": "{cur-dir}/in.txt", "out": "{cur-dir}/out.txt"}] }
            ]
        }),
    );
    rig.write_hub("root.hub", &json!({ "hubs": [ {"path": "sub/child.hub"} ] }));
    rig.add_hub("root.hub");

    rig.wait_until(|r| r.exists("sub/out.txt"));
    rig.settle();

    let info = rig.monitor.tracked_information();
    assert_eq!(info.hubs.len(), 2, "root and child are both tracked");
    rig.check_invariants();
}

#[test]
fn removing_a_pipe_from_the_hub_erases_it() {
    let rig = Rig::new();
    rig.write("a.txt", b"1");
    rig.write("keep.txt", b"2");
    rig.write_hub(
        "root.hub",
        &json!({
            "pipes": [
                { "tool": "copy",
                  "paths": [
                      {"in": "{cur-dir}/a.txt", "out": "{cur-dir}/a.out"},
                      {"in": "{cur-dir}/keep.txt", "out": "{cur-dir}/keep.out"}
                  ] }
            ]
        }),
    );
    rig.add_hub("root.hub");
    rig.wait_until(|r| r.exists("a.out") && r.exists("keep.out"));
    rig.settle();
    assert_eq!(rig.monitor.with_state(|s| s.store.pipes.len()), 2);

    // Rewrite the hub without the first pipe.
    rig.rewrite(
        "root.hub",
        json!({
            "pipes": [
                { "tool": "copy",
                  "paths": [{"in": "{cur-dir}/keep.txt", "out": "{cur-dir}/keep.out"}] }
            ]
        })
        .to_string()
        .as_bytes(),
    );
    rig.wait_until(|r| r.monitor.with_state(|s| s.store.pipes.len()) == 1);
    rig.settle();

    rig.monitor.with_state(|state| {
        let survivor = state.store.pipes.values().next().unwrap();
        assert!(survivor.base_in.ends_with("keep.txt"));
        assert!(!survivor.is_orphan());
    });
    rig.check_invariants();
}

#[test]
fn reparse_reclaims_unchanged_pipes_without_rebuilding() {
    let rig = Rig::new();
    rig.write("a.txt", b"1");
    rig.write_hub(
        "root.hub",
        &json!({
            "pipes": [
                { "tool": "copy",
                  "paths": [{"in": "{cur-dir}/a.txt", "out": "{cur-dir}/a.out"}] }
            ]
        }),
    );
    rig.add_hub("root.hub");
    rig.wait_until(|r| r.exists("a.out"));
    rig.settle();
    let runs = rig.runs();

    // Touch the hub itself; its pipe declaration is unchanged.
    rig.rewrite(
        "root.hub",
        json!({
            "vars": [{"unused": "x"}],
            "pipes": [
                { "tool": "copy",
                  "paths": [{"in": "{cur-dir}/a.txt", "out": "{cur-dir}/a.out"}] }
            ]
        })
        .to_string()
        .as_bytes(),
    );
    rig.cycles(3);
    rig.settle();

    assert_eq!(rig.runs(), runs, "reclaimed pipe must not re-run");
    rig.monitor.with_state(|state| {
        let pipe = state.store.pipes.values().next().unwrap();
        assert!(!pipe.is_orphan());
        assert!(!pipe.path_deps.is_empty(), "dependency set survived the re-parse");
    });
}

#[test]
fn malformed_hub_is_timed_out_and_retried() {
    let rig = Rig::new();
    rig.write("root.hub", b"{ this is not json");
    rig.add_hub("root.hub");
    rig.cycles(2);

    let now = rig.clock.now();
    rig.monitor.with_state(|state| {
        let (&id, hub) = state.store.hubs.iter().next().unwrap();
        assert!(hub.timeout > now, "failed hub is in timeout");
        assert!(
            state.store.dirty_hubs.contains(&id) || state.store.future_dirty_hubs.contains(&id),
            "failed hub stays queued"
        );
    });

    // Fix the file; once the timeout passes the hub parses cleanly.
    rig.write("a.txt", b"1");
    rig.rewrite(
        "root.hub",
        json!({
            "pipes": [
                { "tool": "copy",
                  "paths": [{"in": "{cur-dir}/a.txt", "out": "{cur-dir}/a.out"}] }
            ]
        })
        .to_string()
        .as_bytes(),
    );
    rig.clock.advance(Duration::from_secs(2));
    rig.wait_until(|r| r.exists("a.out"));
    rig.settle();
    rig.check_invariants();
}

#[test]
fn wildcard_in_hub_path_fails_that_hub() {
    let rig = Rig::new();
    rig.write_hub("root.hub", &json!({ "hubs": [ {"path": "sub/*.hub"} ] }));
    rig.add_hub("root.hub");
    rig.cycles(2);

    let now = rig.clock.now();
    rig.monitor.with_state(|state| {
        assert_eq!(state.store.hubs.len(), 1, "no child hub was created");
        let hub = state.store.hubs.values().next().unwrap();
        assert!(hub.timeout > now, "the offending hub is in timeout");
    });
}

#[test]
fn self_referential_hub_fails_that_hub() {
    let rig = Rig::new();
    rig.write_hub("root.hub", &json!({ "hubs": [ {"path": "root.hub"} ] }));
    rig.add_hub("root.hub");
    rig.cycles(2);

    let now = rig.clock.now();
    rig.monitor.with_state(|state| {
        assert_eq!(state.store.hubs.len(), 1);
        let hub = state.store.hubs.values().next().unwrap();
        assert!(hub.timeout > now);
    });
}

#[test]
fn mutually_referential_hubs_fail_the_closing_interpretation() {
    let rig = Rig::new();
    rig.write_hub("a.hub", &json!({ "hubs": [ {"path": "b.hub"} ] }));
    rig.write_hub("b.hub", &json!({ "hubs": [ {"path": "a.hub"} ] }));
    rig.add_hub("a.hub");
    rig.cycles(3);

    let now = rig.clock.now();
    rig.monitor.with_state(|state| {
        assert_eq!(state.store.hubs.len(), 2, "both hubs are tracked, no third node");
        let a = state.store.hubs.values().find(|h| h.path.ends_with("a.hub")).unwrap();
        let b = state.store.hubs.values().find(|h| h.path.ends_with("b.hub")).unwrap();
        // a interpreted cleanly; b tried to close the loop back to its
        // ancestor and was timed out instead.
        assert!(a.timeout <= now, "a is not in timeout");
        assert!(b.timeout > now, "the looping hub is in timeout");
        assert!(!b.is_orphan(), "b stays parented to a");
        assert!(state.store.check_invariants().is_ok());
    });
}

#[test]
fn transitive_hub_cycle_is_detected() {
    let rig = Rig::new();
    rig.write_hub("a.hub", &json!({ "hubs": [ {"path": "b.hub"} ] }));
    rig.write_hub("b.hub", &json!({ "hubs": [ {"path": "c.hub"} ] }));
    rig.write_hub("c.hub", &json!({ "hubs": [ {"path": "a.hub"} ] }));
    rig.add_hub("a.hub");
    rig.cycles(4);

    let now = rig.clock.now();
    rig.monitor.with_state(|state| {
        assert_eq!(state.store.hubs.len(), 3);
        let c = state.store.hubs.values().find(|h| h.path.ends_with("c.hub")).unwrap();
        assert!(c.timeout > now, "the hub closing the cycle is in timeout");
        assert!(state.store.check_invariants().is_ok());
    });
}

#[test]
fn unknown_hub_keys_are_ignored() {
    let rig = Rig::new();
    rig.write("a.txt", b"1");
    rig.write_hub(
        "root.hub",
        &json!({
            "comment": "not a recognized key",
            "pipes": [
                { "tool": "copy",
                  "paths": [{"in": "{cur-dir}/a.txt", "out": "{cur-dir}/a.out"}] }
            ]
        }),
    );
    rig.add_hub("root.hub");
    rig.wait_until(|r| r.exists("a.out"));
    rig.settle();
}
