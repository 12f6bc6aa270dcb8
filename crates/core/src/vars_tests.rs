// SPDX-License-Identifier: MIT

use super::*;
use std::path::PathBuf;

#[test]
fn set_and_get() {
    let mut vars = Variables::new();
    vars.set("ext", "png");
    assert_eq!(vars.get("ext"), Some("png"));
    assert_eq!(vars.get("missing"), None);
}

#[test]
fn later_set_shadows_earlier() {
    let mut vars = Variables::new();
    vars.set("k", "one");
    vars.set("k", "two");
    assert_eq!(vars.get("k"), Some("two"));
    assert_eq!(vars.len(), 1);
}

#[test]
fn with_cur_dir_binds_cur_dir() {
    let vars = Variables::with_cur_dir(&PathBuf::from("/data/assets"));
    assert_eq!(vars.get(CUR_DIR), Some("/data/assets"));
    assert_eq!(vars.cur_dir(), "/data/assets");
}

#[test]
fn cur_dir_defaults_to_empty() {
    let vars = Variables::new();
    assert_eq!(vars.cur_dir(), "");
}

#[test]
fn equality_ignores_insertion_order() {
    let mut a = Variables::new();
    a.set("x", "1");
    a.set("y", "2");
    let mut b = Variables::new();
    b.set("y", "2");
    b.set("x", "1");
    assert_eq!(a, b);
}

#[test]
fn equality_is_value_sensitive() {
    let mut a = Variables::new();
    a.set("x", "1");
    let mut b = Variables::new();
    b.set("x", "2");
    assert_ne!(a, b);
}

#[test]
fn serializes_as_plain_map() {
    let mut vars = Variables::new();
    vars.set("ext", "png");
    let json = serde_json::to_value(&vars).unwrap();
    assert_eq!(json, serde_json::json!({"ext": "png"}));
}
