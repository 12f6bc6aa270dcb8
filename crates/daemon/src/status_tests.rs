// SPDX-License-Identifier: MIT

use super::*;
use forge_wire::{HubEntry, PathEntry, WildcardEntry};

fn sample_info() -> TrackedInfo {
    TrackedInfo {
        tools: vec!["dummy".into(), "smartcopy".into()],
        paths: vec![PathEntry { path: "/data/a.txt".into() }],
        hubs: vec![HubEntry { path: "/data/root.hub".into() }],
        wildcards: vec![WildcardEntry { path: "/data/src/~name~.txt".into() }],
    }
}

#[test]
fn page_lists_every_section() {
    let html = render_status_page(&sample_info());
    assert!(html.contains("Available tools"));
    assert!(html.contains("smartcopy"));
    assert!(html.contains("Tracked hubs"));
    assert!(html.contains("/data/root.hub"));
    assert!(html.contains("Tracked paths"));
    assert!(html.contains("/data/a.txt"));
    assert!(html.contains("Tracked wildcards"));
    assert!(html.contains("~name~"));
}

#[test]
fn empty_sections_render_placeholders() {
    let html = render_status_page(&TrackedInfo::default());
    assert!(html.contains("<em>none</em>"));
}

#[test]
fn markup_in_paths_is_escaped() {
    let info = TrackedInfo {
        tools: vec![],
        paths: vec![PathEntry { path: "/data/<script>".into() }],
        hubs: vec![],
        wildcards: vec![],
    };
    let html = render_status_page(&info);
    assert!(html.contains("&lt;script&gt;"));
    assert!(!html.contains("<script>"));
}
