// SPDX-License-Identifier: MIT

//! Unix-socket listener: one task per connection, wire framing, graceful
//! shutdown on request.

use crate::pipeline::Pipeline;
use forge_wire::{read_request, write_response, ProtocolError, Request, Response};
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;

/// Accept connections until a shutdown is requested (over the socket or by
/// the caller flipping the watch).
pub async fn serve(
    listener: UnixListener,
    pipeline: Arc<Pipeline>,
    shutdown: watch::Sender<bool>,
) {
    let mut shutdown_rx = shutdown.subscribe();
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let pipeline = Arc::clone(&pipeline);
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, pipeline, shutdown).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                }
            }
            _ = shutdown_rx.changed() => {
                tracing::info!("listener shutting down");
                return;
            }
        }
    }
}

async fn handle_connection(
    mut stream: UnixStream,
    pipeline: Arc<Pipeline>,
    shutdown: watch::Sender<bool>,
) -> Result<(), ProtocolError> {
    loop {
        let request = match read_request(&mut stream).await {
            Ok(request) => request,
            // A closed peer is the normal end of a session.
            Err(ProtocolError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        tracing::debug!(?request, "request received");

        let wants_shutdown = matches!(request, Request::Shutdown);
        let response = if wants_shutdown {
            Response::ShuttingDown
        } else {
            // Monitor control calls join threads; keep them off the runtime.
            let pipeline = Arc::clone(&pipeline);
            tokio::task::spawn_blocking(move || pipeline.handle(request))
                .await
                .unwrap_or_else(|e| Response::Error { message: e.to_string() })
        };

        write_response(&mut stream, &response).await?;

        if wants_shutdown {
            let _ = shutdown.send(true);
            return Ok(());
        }
    }
}
