// SPDX-License-Identifier: MIT

//! Path polling: change detection, the epsilon, and missing files.

use super::Rig;
use forge_core::{Clock, NodeId};
use serde_json::json;
use std::time::Duration;

/// A hub whose only content is a copy pipe; gives the rig one monitored
/// input path to play with.
fn setup_copy(rig: &Rig) {
    rig.write("a.txt", b"v1");
    rig.write_hub(
        "root.hub",
        &json!({
            "pipes": [
                { "tool": "copy",
                  "paths": [{"in": "{cur-dir}/a.txt", "out": "{cur-dir}/b.txt"}] }
            ]
        }),
    );
    rig.add_hub("root.hub");
    rig.wait_until(|r| r.exists("b.txt"));
    rig.settle();
}

fn input_path_id(rig: &Rig) -> NodeId {
    rig.monitor.with_state(|state| {
        let pipe = state.store.pipes.values().find(|p| p.tool == "copy").unwrap();
        pipe.path_deps[0]
    })
}

#[test]
fn unchanged_path_stays_quiet() {
    let rig = Rig::new();
    setup_copy(&rig);
    let runs = rig.runs();

    rig.cycles(4);
    assert_eq!(rig.runs(), runs);
}

#[test]
fn all_paths_are_requeued_as_suspects_each_cycle() {
    let rig = Rig::new();
    setup_copy(&rig);
    rig.cycle();

    rig.monitor.with_state(|state| {
        let tracked: usize = state.store.paths.len();
        assert!(tracked >= 2, "hub file and input are monitored");
        assert_eq!(
            state.store.suspect_paths.len(),
            tracked,
            "every monitored path is probed again next cycle"
        );
    });
}

#[test]
fn missing_then_reappearing_unchanged_fires_no_cascade() {
    let rig = Rig::new();
    setup_copy(&rig);
    let runs = rig.runs();
    let path_id = input_path_id(&rig);

    // Stash the file away; the monitor sees it missing and backs off.
    let a = rig.path("a.txt");
    let hidden = rig.path("a.hidden");
    std::fs::rename(&a, &hidden).unwrap();
    rig.cycle();
    rig.monitor.with_state(|state| {
        assert!(state.store.paths.contains_key(&path_id), "referenced path is kept");
    });

    // Restore it with its write time intact, step past the retry timeout.
    std::fs::rename(&hidden, &a).unwrap();
    rig.clock.advance(Duration::from_secs(2));
    rig.cycles(3);
    rig.settle();

    assert_eq!(rig.runs(), runs, "unchanged reappearance must not rebuild");
}

#[test]
fn missing_then_reappearing_changed_rebuilds_once() {
    let rig = Rig::new();
    setup_copy(&rig);
    let runs = rig.runs();

    let a = rig.path("a.txt");
    std::fs::remove_file(&a).unwrap();
    rig.cycle();

    std::thread::sleep(Duration::from_millis(15));
    rig.write("a.txt", b"v2");
    rig.clock.advance(Duration::from_secs(2));
    rig.wait_until(|r| r.runs() > runs);
    rig.settle();

    assert_eq!(rig.runs(), runs + 1, "changed reappearance rebuilds exactly once");
    assert_eq!(rig.read("b.txt"), b"v2");
}

#[test]
fn missing_unreferenced_path_is_dropped() {
    let rig = Rig::new();
    setup_copy(&rig);

    // Forge a monitored path nothing refers to.
    let stray = rig.write("stray.txt", b"x");
    rig.monitor.with_state(|state| {
        let now = rig.clock.now();
        state.store.find_or_add_monitored_path(&stray, None, now);
    });
    rig.cycle();

    std::fs::remove_file(&stray).unwrap();
    rig.cycles(2);

    rig.monitor.with_state(|state| {
        assert!(
            !state.store.paths.values().any(|p| p.path == stray),
            "unreferenced missing path lingers"
        );
    });
}

#[test]
fn probe_backoff_respects_timeout() {
    let rig = Rig::new();
    setup_copy(&rig);
    let path_id = input_path_id(&rig);

    std::fs::remove_file(rig.path("a.txt")).unwrap();
    rig.cycle();

    // Within the timeout the path sits on the future list.
    rig.cycle();
    rig.monitor.with_state(|state| {
        assert!(state.store.future_suspect_paths.contains(&path_id));
    });
}
