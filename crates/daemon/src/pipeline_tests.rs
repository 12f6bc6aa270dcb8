// SPDX-License-Identifier: MIT

use super::*;
use crate::config::parse_status_addr;

fn test_config(dir: &tempfile::TempDir) -> Config {
    Config {
        state_dir: dir.path().to_path_buf(),
        socket_path: dir.path().join("forged.sock"),
        lock_path: dir.path().join("forged.pid"),
        log_path: dir.path().join("forged.log"),
        persistent_dir: dir.path().join("pipeline"),
        reference_dir: dir.path().to_path_buf(),
        status_addr: parse_status_addr("127.0.0.1:0").unwrap(),
        max_workers: Some(1),
    }
}

#[test]
fn ping_pongs() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(&test_config(&dir));
    assert_eq!(pipeline.handle(Request::Ping), Response::Pong);
    pipeline.shutdown();
}

#[test]
fn status_lists_builtin_tools() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(&test_config(&dir));
    let Response::Status { info } = pipeline.handle(Request::Status) else {
        panic!("expected a status response");
    };
    assert!(info.tools.contains(&"smartcopy".to_string()));
    assert!(info.tools.contains(&"dummy".to_string()));
    pipeline.shutdown();
}

#[test]
fn start_then_stop_processing() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(&test_config(&dir));

    assert_eq!(pipeline.handle(Request::StartProcessing), Response::Ok);
    // A second start cannot succeed while the monitor runs.
    assert!(matches!(
        pipeline.handle(Request::StartProcessing),
        Response::Error { .. }
    ));
    assert_eq!(pipeline.handle(Request::StopProcessing), Response::Ok);
    pipeline.shutdown();
}

#[test]
fn directory_overrides_require_a_stopped_monitor() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(&test_config(&dir));

    assert_eq!(pipeline.handle(Request::StartProcessing), Response::Ok);
    assert!(matches!(
        pipeline.handle(Request::SetReferenceDirectory { path: "/elsewhere".into() }),
        Response::Error { .. }
    ));
    assert_eq!(pipeline.handle(Request::StopProcessing), Response::Ok);
    assert_eq!(
        pipeline.handle(Request::SetReferenceDirectory { path: "/elsewhere".into() }),
        Response::Ok
    );
    pipeline.shutdown();
}

#[test]
fn add_base_hub_registers_the_hub() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("root.hub"), b"{}").unwrap();
    let pipeline = Pipeline::new(&test_config(&dir));

    assert_eq!(
        pipeline.handle(Request::AddBaseHubFile { path: "root.hub".into() }),
        Response::Ok
    );
    let Response::Status { info } = pipeline.handle(Request::Status) else {
        panic!("expected a status response");
    };
    assert_eq!(info.hubs.len(), 1);
    assert!(info.hubs[0].path.ends_with("root.hub"));
    pipeline.shutdown();
}

#[test]
fn shutdown_request_reports_shutting_down() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(&test_config(&dir));
    assert_eq!(pipeline.handle(Request::Shutdown), Response::ShuttingDown);
    pipeline.shutdown();
}
