// SPDX-License-Identifier: MIT

//! One-shot request/response client over the daemon socket

use anyhow::Context;
use forge_wire::{encode, read_message, write_message, Request, Response};
use std::path::Path;
use tokio::net::UnixStream;

pub async fn send(socket: &Path, request: Request) -> anyhow::Result<Response> {
    let mut stream = UnixStream::connect(socket)
        .await
        .with_context(|| format!("connecting to {} (is forged running?)", socket.display()))?;

    let payload = encode(&request)?;
    write_message(&mut stream, &payload).await?;

    let reply = read_message(&mut stream).await.context("reading daemon response")?;
    Ok(forge_wire::decode(&reply)?)
}
