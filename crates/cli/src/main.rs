// SPDX-License-Identifier: MIT

//! `forge`: client for the forge pipeline daemon.

mod client;
mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use forge_daemon::Config;
use forge_wire::{Request, Response};

#[derive(Debug, Parser)]
#[command(name = "forge", version, about = "Control the forge pipeline daemon")]
struct Args {
    /// Socket of the daemon (defaults to the user state directory)
    #[arg(long)]
    socket: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the daemon is alive
    Ping,
    /// Start the change monitor
    Start,
    /// Stop the change monitor
    Stop,
    /// Add a root hub manifest
    AddHub {
        /// Path to the hub file, relative to the daemon's reference directory
        path: String,
    },
    /// Override the anchor for relative hub paths (monitor must be stopped)
    SetRefDir { path: String },
    /// Override where state.json lives (monitor must be stopped)
    SetPersistDir { path: String },
    /// Show what the pipeline tracks
    Status,
    /// Shut the daemon down
    Shutdown,
}

impl Command {
    fn into_request(self) -> Request {
        match self {
            Command::Ping => Request::Ping,
            Command::Start => Request::StartProcessing,
            Command::Stop => Request::StopProcessing,
            Command::AddHub { path } => Request::AddBaseHubFile { path },
            Command::SetRefDir { path } => Request::SetReferenceDirectory { path },
            Command::SetPersistDir { path } => Request::SetPersistentDirectory { path },
            Command::Status => Request::Status,
            Command::Shutdown => Request::Shutdown,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let socket = match args.socket {
        Some(socket) => socket,
        None => Config::load().context("locating the daemon socket")?.socket_path,
    };

    let response = client::send(&socket, args.command.into_request()).await?;
    let failed = matches!(response, Response::Error { .. });
    print!("{}", output::render(&response));
    if failed {
        std::process::exit(1);
    }
    Ok(())
}
