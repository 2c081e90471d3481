use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use opsbuddy_observability::init_observability;

use crate::{
    error::Result, healthcheck::HealthCheckArgs, ingest::IngestArgs, writer::WriterArgs,
};

mod error;
mod healthcheck;
mod ingest;
mod writer;

#[derive(Parser)]
#[command(name = "opsbuddy")]
#[command(about = "OpsBuddy observability platform")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gRPC log ingestion service
    Ingest {
        #[clap(flatten)]
        inner: IngestArgs,
    },
    /// Run the bus consumer / time-series writer
    Writer {
        #[clap(flatten)]
        inner: WriterArgs,
    },
    /// Run the health-check engine
    Healthcheck {
        #[clap(flatten)]
        inner: HealthCheckArgs,
    },
}

#[tokio::main]
#[snafu::report]
async fn main() -> Result<()> {
    init_observability(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();

    let ct = CancellationToken::new();

    let ct_clone = ct.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        ct_clone.cancel();
    });

    match cli.command {
        Commands::Ingest { inner } => inner.run(ct).await,
        Commands::Writer { inner } => inner.run(ct).await,
        Commands::Healthcheck { inner } => inner.run(ct).await,
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
