// SPDX-License-Identifier: MIT

//! Persistence across monitor generations: settled state is saved, reloads
//! reclaim pipes, and nothing rebuilds unless an input really changed.

use super::Rig;
use crate::monitor::ChangeMonitor;
use forge_probe::SystemProbe;
use serde_json::json;
use std::sync::Arc;

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

/// A second monitor over the same directories and worker pool, standing in
/// for a process restart.
fn second_generation(rig: &Rig) -> ChangeMonitor<forge_core::FakeClock> {
    let monitor = ChangeMonitor::with_clock(
        Arc::new(SystemProbe::new()),
        Arc::clone(&rig.wrangler),
        rig.clock.clone(),
    );
    monitor.set_persistent_directory(&rig.persist_dir()).unwrap();
    monitor.set_reference_directory(&rig.path("")).unwrap();
    monitor.load_persistent_now();
    monitor
}

#[test]
fn settled_state_is_written_to_disk() {
    let rig = Rig::new();
    rig.write("a.txt", b"payload");
    copy_hub(&rig);
    rig.add_hub("root.hub");
    rig.wait_until(|r| r.exists("b.txt"));
    rig.settle();
    rig.cycles(2);

    let state = forge_storage::load(&rig.persist_dir()).unwrap().unwrap();
    assert!(!state.paths.is_empty());
    assert_eq!(state.pipes.len(), 1);
    assert_eq!(state.pipes[0].tool, "copy");
    assert_eq!(state.pipes[0].paths.len(), 1, "dependency set is persisted");
}

#[test]
fn reload_reclaims_pipes_without_rebuilding() {
    let rig = Rig::new();
    rig.write("a.txt", b"payload");
    copy_hub(&rig);
    rig.add_hub("root.hub");
    rig.wait_until(|r| r.exists("b.txt"));
    rig.settle();
    rig.cycles(2);
    let runs = rig.runs();

    let restarted = second_generation(&rig);
    restarted.with_state(|state| {
        assert_eq!(state.store.pipes.len(), 1);
        let pipe = state.store.pipes.values().next().unwrap();
        assert!(pipe.is_orphan(), "loaded pipes start orphaned");
        assert!(pipe.from_snapshot);
        assert!(!pipe.path_deps.is_empty());
    });

    restarted.add_base_hub_file(std::path::Path::new("root.hub"));
    for _ in 0..4 {
        restarted.cycle_once();
        std::thread::sleep(std::time::Duration::from_millis(5));
    }

    restarted.with_state(|state| {
        assert_eq!(state.store.pipes.len(), 1, "the hub reclaimed the loaded pipe");
        let pipe = state.store.pipes.values().next().unwrap();
        assert!(!pipe.is_orphan());
        assert!(!pipe.from_snapshot, "adoption clears snapshot provenance");
    });
    assert_eq!(rig.runs(), runs, "no rebuild on a warm start with unchanged inputs");
}

#[test]
fn reload_rebuilds_when_the_input_changed_while_down() {
    let rig = Rig::new();
    rig.write("a.txt", b"old");
    copy_hub(&rig);
    rig.add_hub("root.hub");
    rig.wait_until(|r| r.exists("b.txt"));
    rig.settle();
    rig.cycles(2);
    let runs = rig.runs();

    // Change the input "while the monitor is down".
    rig.rewrite("a.txt", b"new");

    let restarted = second_generation(&rig);
    restarted.add_base_hub_file(std::path::Path::new("root.hub"));

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
    while rig.runs() == runs {
        assert!(std::time::Instant::now() < deadline, "rebuild never happened");
        restarted.cycle_once();
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    assert_eq!(rig.read("b.txt"), b"new");
}

#[test]
fn loaded_orphans_survive_cleanup_until_adopted() {
    let rig = Rig::new();
    rig.write("a.txt", b"payload");
    copy_hub(&rig);
    rig.add_hub("root.hub");
    rig.wait_until(|r| r.exists("b.txt"));
    rig.settle();
    rig.cycles(2);

    let restarted = second_generation(&rig);
    // Cycles without any hub: the loaded pipe must not be garbage
    // collected while it waits for its hub to be re-interpreted.
    for _ in 0..3 {
        restarted.cycle_once();
    }
    restarted.with_state(|state| {
        assert_eq!(state.store.pipes.len(), 1);
        assert!(state.store.check_invariants().is_ok());
    });
}
