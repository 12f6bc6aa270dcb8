// SPDX-License-Identifier: MIT

//! Plain-text rendering of daemon responses

use forge_wire::Response;

pub fn render(response: &Response) -> String {
    match response {
        Response::Ok => "ok\n".to_string(),
        Response::Pong => "pong\n".to_string(),
        Response::ShuttingDown => "daemon shutting down\n".to_string(),
        Response::Error { message } => format!("error: {message}\n"),
        Response::Status { info } => {
            let mut out = String::new();
            out.push_str("tools:\n");
            for tool in &info.tools {
                out.push_str(&format!("  {tool}\n"));
            }
            out.push_str(&format!("hubs ({}):\n", info.hubs.len()));
            for hub in &info.hubs {
                out.push_str(&format!("  {}\n", hub.path));
            }
            out.push_str(&format!("paths ({}):\n", info.paths.len()));
            for path in &info.paths {
                out.push_str(&format!("  {}\n", path.path));
            }
            out.push_str(&format!("wildcards ({}):\n", info.wildcards.len()));
            for wildcard in &info.wildcards {
                out.push_str(&format!("  {}\n", wildcard.path));
            }
            out
        }
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
