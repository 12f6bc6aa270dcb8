// SPDX-License-Identifier: MIT

//! `forged`: the forge pipeline daemon.

use anyhow::{bail, Context};
use clap::Parser;
use forge_daemon::{config, listener, status, Config, Pipeline};
use fs2::FileExt as _;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::UnixListener;
use tokio::sync::watch;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

#[derive(Debug, Parser)]
#[command(name = "forged", version, about = "Incremental asset pipeline daemon")]
struct Args {
    /// Anchor for relative hub paths (defaults to the invoking directory)
    #[arg(long)]
    reference_dir: Option<PathBuf>,

    /// Where state.json lives (defaults under the state directory)
    #[arg(long)]
    persistent_dir: Option<PathBuf>,

    /// Bind address of the HTML status page
    #[arg(long)]
    status_addr: Option<String>,

    /// Worker pool size (defaults to hardware concurrency)
    #[arg(long)]
    workers: Option<usize>,

    /// Start the change monitor immediately instead of waiting for a
    /// start_processing request
    #[arg(long)]
    start: bool,
}

fn apply_args(config: &mut Config, args: &Args) -> anyhow::Result<()> {
    if let Some(dir) = &args.reference_dir {
        config.reference_dir = dir.clone();
    }
    if let Some(dir) = &args.persistent_dir {
        config.persistent_dir = dir.clone();
    }
    if let Some(addr) = &args.status_addr {
        config.status_addr = config::parse_status_addr(addr)?;
    }
    if let Some(workers) = args.workers {
        config.max_workers = Some(workers);
    }
    Ok(())
}

/// Take the PID lock; a second daemon on the same state dir refuses to
/// start. The handle is held until exit.
fn acquire_lock(config: &Config) -> anyhow::Result<std::fs::File> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&config.lock_path)
        .with_context(|| format!("opening lock file {}", config.lock_path.display()))?;
    if file.try_lock_exclusive().is_err() {
        bail!("another forged instance holds {}", config.lock_path.display());
    }
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

fn init_tracing(config: &Config) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
        .with_context(|| format!("opening log file {}", config.log_path.display()))?;
    let (file_writer, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new("info")
        }))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(false),
        )
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = Config::load()?;
    apply_args(&mut config, &args)?;

    std::fs::create_dir_all(&config.state_dir)
        .with_context(|| format!("creating state dir {}", config.state_dir.display()))?;

    let _log_guard = init_tracing(&config)?;
    let _lock = acquire_lock(&config)?;

    // Boot banner.
    eprintln!("forged {} (incremental asset pipeline)", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        socket = %config.socket_path.display(),
        status = %config.status_addr,
        reference_dir = %config.reference_dir.display(),
        "daemon starting"
    );

    let pipeline = Arc::new(Pipeline::new(&config));

    if args.start {
        if let forge_wire::Response::Error { message } =
            pipeline.handle(forge_wire::Request::StartProcessing)
        {
            bail!("could not start processing: {message}");
        }
    }

    // A stale socket from a dead daemon would block the bind.
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    let socket = UnixListener::bind(&config.socket_path)
        .with_context(|| format!("binding {}", config.socket_path.display()))?;

    let status_listener = tokio::net::TcpListener::bind(config.status_addr)
        .await
        .with_context(|| format!("binding status address {}", config.status_addr))?;
    let status_app = status::router(Arc::clone(&pipeline));

    let (shutdown_tx, mut status_shutdown_rx) = watch::channel(false);

    let status_task = tokio::spawn(async move {
        let server = axum::serve(status_listener, status_app).with_graceful_shutdown(async move {
            let _ = status_shutdown_rx.changed().await;
        });
        if let Err(e) = server.await {
            tracing::warn!(error = %e, "status server ended with error");
        }
    });

    listener::serve(socket, Arc::clone(&pipeline), shutdown_tx).await;

    tracing::info!("shutting down");
    let _ = status_task.await;
    let shutdown_pipeline = Arc::clone(&pipeline);
    let _ = tokio::task::spawn_blocking(move || shutdown_pipeline.shutdown()).await;
    let _ = std::fs::remove_file(&config.socket_path);
    Ok(())
}
