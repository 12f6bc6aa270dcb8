// SPDX-License-Identifier: MIT

//! The HTML status surface: one page listing what the pipeline tracks.

use crate::pipeline::Pipeline;
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use forge_wire::TrackedInfo;
use std::sync::Arc;

pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new().route("/", get(root)).with_state(pipeline)
}

async fn root(State(pipeline): State<Arc<Pipeline>>) -> Html<String> {
    let info = tokio::task::spawn_blocking(move || pipeline.tracked_info())
        .await
        .unwrap_or_default();
    Html(render_status_page(&info))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn section(out: &mut String, title: &str, items: impl Iterator<Item = String>) {
    out.push_str("<h2>");
    out.push_str(title);
    out.push_str("</h2>\n<ul>\n");
    let mut empty = true;
    for item in items {
        empty = false;
        out.push_str("<li>");
        out.push_str(&escape(&item));
        out.push_str("</li>\n");
    }
    if empty {
        out.push_str("<li><em>none</em></li>\n");
    }
    out.push_str("</ul>\n");
}

/// Render the status page. Pure, so tests can assert on the markup.
pub fn render_status_page(info: &TrackedInfo) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head><title>forge pipeline</title></head>\n<body>\n");
    out.push_str("<h1>forge pipeline</h1>\n");
    section(&mut out, "Available tools", info.tools.iter().cloned());
    section(&mut out, "Tracked hubs", info.hubs.iter().map(|h| h.path.clone()));
    section(&mut out, "Tracked paths", info.paths.iter().map(|p| p.path.clone()));
    section(&mut out, "Tracked wildcards", info.wildcards.iter().map(|w| w.path.clone()));
    out.push_str("</body>\n</html>\n");
    out
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
