// SPDX-License-Identifier: MIT

use super::*;
use crate::probe::SystemProbe;

fn snooped() -> SnoopingProbe {
    SnoopingProbe::new(Arc::new(SystemProbe::new()))
}

#[test]
fn read_records_read_access_with_prior_mtime() {
    let dir = tempfile::tempdir().unwrap();
    let sys = SystemProbe::new();
    let path = dir.path().join("in.txt");
    sys.write(&path, b"data").unwrap();
    let mtime = sys.last_write_time(&path).unwrap();

    let probe = snooped();
    probe.read(&path).unwrap();

    let list = probe.get_list();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].path, path);
    assert!(!list[0].write_access);
    assert_eq!(list[0].previous_last_write_time, mtime);
}

#[test]
fn write_records_write_access() {
    let dir = tempfile::tempdir().unwrap();
    let probe = snooped();
    let path = dir.path().join("out.txt");

    probe.write(&path, b"data").unwrap();

    let list = probe.get_list();
    assert_eq!(list.len(), 1);
    assert!(list[0].write_access);
    assert_eq!(list[0].previous_last_write_time, EPOCH);
}

#[test]
fn duplicate_reads_collapse() {
    let dir = tempfile::tempdir().unwrap();
    let sys = SystemProbe::new();
    let path = dir.path().join("in.txt");
    sys.write(&path, b"data").unwrap();

    let probe = snooped();
    probe.read(&path).unwrap();
    probe.read(&path).unwrap();

    assert_eq!(probe.get_list().len(), 1);
}

#[test]
fn write_access_wins_over_read() {
    let dir = tempfile::tempdir().unwrap();
    let sys = SystemProbe::new();
    let path = dir.path().join("f.txt");
    sys.write(&path, b"data").unwrap();

    let probe = snooped();
    probe.read(&path).unwrap();
    probe.write(&path, b"more").unwrap();

    let list = probe.get_list();
    assert_eq!(list.len(), 1);
    assert!(list[0].write_access);
}

#[test]
fn previous_time_is_captured_at_first_read() {
    let dir = tempfile::tempdir().unwrap();
    let sys = SystemProbe::new();
    let path = dir.path().join("in.txt");
    sys.write(&path, b"v1").unwrap();
    let before = sys.last_write_time(&path).unwrap();

    let probe = snooped();
    probe.read(&path).unwrap();

    // Rewrite after the first read; the record must keep the pre-read time.
    std::thread::sleep(std::time::Duration::from_millis(15));
    sys.write(&path, b"v2").unwrap();
    probe.read(&path).unwrap();

    let list = probe.get_list();
    assert_eq!(list[0].previous_last_write_time, before);
}

#[test]
fn copy_records_read_and_write() {
    let dir = tempfile::tempdir().unwrap();
    let sys = SystemProbe::new();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    sys.write(&a, b"data").unwrap();

    let probe = snooped();
    probe.copy(&a, &b).unwrap();

    let list = probe.get_list();
    assert_eq!(list.len(), 2);
    let read = list.iter().find(|r| r.path == a).unwrap();
    let written = list.iter().find(|r| r.path == b).unwrap();
    assert!(!read.write_access);
    assert!(written.write_access);
}

#[test]
fn metadata_queries_are_not_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let sys = SystemProbe::new();
    let path = dir.path().join("f.txt");
    sys.write(&path, b"data").unwrap();

    let probe = snooped();
    let _ = probe.exists(&path);
    let _ = probe.last_write_time(&path).unwrap();
    let _ = probe.read_dir(dir.path()).unwrap();

    assert!(probe.get_list().is_empty());
}
