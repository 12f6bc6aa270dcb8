// SPDX-License-Identifier: MIT

//! Pipe execution, incrementality and failure handling.

use super::Rig;
use serde_json::json;
use std::time::Duration;

fn copy_hub(rig: &Rig) {
    rig.write_hub(
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
fn single_pipe_copy_executes_once() {
    let rig = Rig::new();
    rig.write("a.txt", b"payload");
    copy_hub(&rig);
    rig.add_hub("root.hub");

    rig.wait_until(|r| r.exists("b.txt"));
    rig.settle();

    assert_eq!(rig.read("b.txt"), b"payload");
    assert_eq!(rig.runs(), 1);
    rig.check_invariants();
}

#[test]
fn no_change_means_no_resubmission() {
    let rig = Rig::new();
    rig.write("a.txt", b"payload");
    copy_hub(&rig);
    rig.add_hub("root.hub");

    rig.wait_until(|r| r.exists("b.txt"));
    rig.settle();
    let runs_after_first = rig.runs();

    // Plenty of extra cycles with nothing changed.
    rig.cycles(5);
    rig.settle();
    assert_eq!(rig.runs(), runs_after_first, "unchanged input re-ran the pipe");
}

#[test]
fn changed_input_reruns_the_pipe() {
    let rig = Rig::new();
    rig.write("a.txt", b"one");
    copy_hub(&rig);
    rig.add_hub("root.hub");
    rig.wait_until(|r| r.exists("b.txt"));
    rig.settle();
    let runs_after_first = rig.runs();

    rig.rewrite("a.txt", b"two");
    rig.wait_until(|r| r.runs() > runs_after_first);
    rig.settle();

    assert_eq!(rig.read("b.txt"), b"two");
    rig.check_invariants();
}

#[test]
fn result_establishes_dependency_set() {
    let rig = Rig::new();
    let a = rig.write("a.txt", b"payload");
    copy_hub(&rig);
    rig.add_hub("root.hub");
    rig.wait_until(|r| r.exists("b.txt"));
    rig.settle();

    rig.monitor.with_state(|state| {
        let pipe = state.store.pipes.values().find(|p| p.tool == "copy").unwrap();
        let dep_paths: Vec<_> = pipe
            .path_deps
            .iter()
            .map(|id| state.store.paths[id].path.clone())
            .collect();
        assert_eq!(dep_paths, vec![a.clone()], "the read input is the dependency");
    });
}

#[test]
fn failing_tool_is_timed_out_and_retried() {
    let rig = Rig::new();
    rig.write("a.txt", b"payload");
    rig.write_hub(
        "root.hub",
        &json!({
            "pipes": [
                { "tool": "alwaysfails",
                  "paths": [{"in": "{cur-dir}/a.txt", "out": "{cur-dir}/b.txt"}] }
            ]
        }),
    );
    rig.add_hub("root.hub");

    // First attempt fails and parks the pipe behind a four second timeout.
    rig.wait_until(|r| r.runs() == 1);
    rig.wait_until(|r| {
        r.monitor.with_state(|state| {
            state.store.pipes.values().next().is_some_and(|p| p.timeout > forge_core::EPOCH)
                && state.store.pending_pipes.is_empty()
        })
    });
    rig.monitor.with_state(|state| {
        let (&id, _) = state.store.pipes.iter().next().unwrap();
        assert!(
            state.store.dirty_pipes.contains(&id) || state.store.future_dirty_pipes.contains(&id),
            "failed pipe is requeued"
        );
    });

    // While the timeout holds, cycles defer it without resubmitting.
    rig.cycles(4);
    assert_eq!(rig.runs(), 1, "deferred pipe must not re-run inside its timeout");

    // Past the timeout it is attempted again.
    rig.clock.advance(Duration::from_secs(5));
    rig.wait_until(|r| r.runs() >= 2);
    rig.check_invariants();
}

#[test]
fn input_changed_mid_build_is_re_dirtied() {
    let rig = Rig::new();
    rig.write("a.txt", b"v1");
    rig.write_hub(
        "root.hub",
        &json!({
            "pipes": [
                { "tool": "gatedcopy",
                  "paths": [{"in": "{cur-dir}/a.txt", "out": "{cur-dir}/b.txt"}] }
            ]
        }),
    );
    rig.add_hub("root.hub");

    // First run: let it finish untouched to establish the dependency.
    rig.open_gate();
    rig.wait_until(|r| r.exists("b.txt"));
    rig.settle();
    let runs_after_first = rig.runs();

    // Second run: trigger it, then change the input while the tool holds
    // the gate open.
    rig.gate_started.store(false, std::sync::atomic::Ordering::SeqCst);
    rig.gate_release.store(false, std::sync::atomic::Ordering::SeqCst);
    rig.rewrite("a.txt", b"v2");
    rig.wait_until(|r| r.gate_started());

    // The monitor observes the third rewrite while the pipe is pending;
    // pending pipes ignore the signal, but the observation moves the
    // stored write time past what the tool saw.
    rig.rewrite("a.txt", b"v3");
    rig.cycles(2);

    rig.open_gate();
    rig.wait_until(|r| r.runs() > runs_after_first + 1);
    rig.settle();

    assert_eq!(rig.read("b.txt"), b"v3", "the re-run picked up the mid-build change");
    rig.check_invariants();
}
