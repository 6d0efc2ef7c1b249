#![doc = include_str!("../README.md")]

mod config;
mod telemetry;

use anyhow::Context;
use clap::Parser;
use config::{CliArgs, RunConfig};
use summands::{CombinationFinder, SearchSummary};
use telemetry::init_telemetry;
use tokio::signal;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

// Every combination is its own small allocation; mimalloc keeps that cheap.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = RunConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let cancel = CancellationToken::new();
    let (progress_tx, progress_rx) = watch::channel(0u64);
    let reporter = tokio::spawn(report_progress(progress_rx));
    let shutdown = tokio::spawn(shutdown_signal(cancel.clone()));

    let finder = CombinationFinder::new(config.finder).with_cancellation(cancel);
    let params = config.params;
    let output_dir = config.output_dir.clone();

    // The search is CPU bound and writes files synchronously, so it runs on
    // the blocking pool. Progress crosses back through the watch channel.
    let outcome = tokio::task::spawn_blocking(move || {
        finder.run(params, output_dir, |total| {
            progress_tx.send_replace(total);
        })
    })
    .await
    .context("Search task panicked")?;

    shutdown.abort();
    // The sender was dropped with the search closure, so this ends promptly.
    let _ = reporter.await;

    match outcome {
        Ok(summary) => report_summary(&summary, config.json),
        Err(err) if err.is_cancelled() => {
            tracing::warn!(
                "Search cancelled, partial output kept under {}",
                config.output_dir.join(config.params.key()).display()
            );
            Err(err.into())
        }
        Err(err) => Err(anyhow::Error::new(err).context(format!(
            "Search for {} failed",
            config.params.key()
        ))),
    }
}

fn log_startup_info(config: &RunConfig) {
    if config.bound_reset {
        tracing::warn!(
            "Upper bound exceeds target {}, using default bound {}",
            config.params.target(),
            config.params.bound()
        );
    }

    if cfg!(debug_assertions) {
        tracing::info!("Starting search with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting search for {} into {}",
            config.params.key(),
            config.output_dir.display()
        );
    }
}

async fn report_progress(mut progress: watch::Receiver<u64>) {
    while progress.changed().await.is_ok() {
        let total = *progress.borrow_and_update();
        tracing::info!(total, "Combinations found so far");
    }
}

fn report_summary(summary: &SearchSummary, json: bool) -> anyhow::Result<()> {
    tracing::info!(
        total = summary.total,
        files = summary.files.len(),
        "Found {} combinations in {:.3}s",
        summary.total,
        summary.elapsed.as_secs_f64()
    );

    if json {
        let out = serde_json::to_string_pretty(summary).context("Failed to encode summary")?;
        println!("{out}");
    } else {
        for file in &summary.files {
            println!("{}", file.display());
        }
    }
    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Stopping search, output written so far is kept");
    cancel.cancel();
}
