//! Blobscribe Worker - headless transcription of WAV blobs.
//!
//! Watches an input directory, sends every new WAV file to the speech
//! recognition service and writes `{name}.json` transcripts to the output
//! directory. With text analytics configured, transcripts are also analyzed
//! for sentiment, entities and key phrases. Runs until Ctrl+C / SIGTERM, or
//! once with `--once`.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use blobscribe_core::{bootstrap_services, HeaderMode};
use clap::Parser;
use tokio::signal;

use crate::config::WorkerConfig;

/// Blobscribe Worker - transcribes WAV files dropped into a directory.
#[derive(Parser, Debug)]
#[command(name = "blobscribe-worker")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "BLOBSCRIBE_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Input directory (overrides config file).
    #[arg(short, long, env = "BLOBSCRIBE_INPUT_DIR")]
    input_dir: Option<PathBuf>,

    /// Output directory (overrides config file).
    #[arg(short, long, env = "BLOBSCRIBE_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Seconds between directory scans (overrides config file).
    #[arg(short, long)]
    poll_interval: Option<u64>,

    /// Directory for text analytics results (overrides config file).
    #[arg(long, env = "BLOBSCRIBE_ANALYTICS_DIR")]
    analytics_dir: Option<PathBuf>,

    /// Seconds a file must stay unmodified before it is picked up.
    #[arg(long)]
    settle_time: Option<u64>,

    /// Skip unknown chunks such as LIST before fmt/data.
    #[arg(long)]
    scan_chunks: bool,

    /// Process pending files once and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Blobscribe Worker v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        WorkerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(dir) = args.input_dir {
        config.input_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(dir) = args.analytics_dir {
        config.analytics_dir = dir;
    }
    if let Some(secs) = args.settle_time {
        config.settle_time = secs;
    }
    if let Some(interval) = args.poll_interval {
        config.poll_interval = interval;
    }
    if args.scan_chunks {
        config.header_mode = HeaderMode::ScanChunks;
    }

    log::info!(
        "Configuration: input_dir={}, output_dir={}, region={}, language={}, header_mode={:?}",
        config.input_dir.display(),
        config.output_dir.display(),
        if config.region.is_empty() { "-" } else { config.region.as_str() },
        config.language,
        config.header_mode
    );
    if !config.analytics_endpoint.is_empty() {
        log::info!(
            "Text analytics: endpoint={}, results={}",
            config.analytics_endpoint,
            config.analytics_dir.display()
        );
    }

    let core_config = config.to_core_config();
    let services = bootstrap_services(&core_config).context(
        "Failed to bootstrap services. \
         Set speechApiKey and speechApiRegion (or BLOBSCRIBE_ENDPOINT) in the environment \
         or the config file.",
    )?;

    log::info!("Services bootstrapped successfully");

    if args.once {
        let written = services
            .run_once()
            .await
            .context("Failed to scan input directory")?;
        log::info!("Wrote {} transcript(s)", written);
        return Ok(());
    }

    let runner = {
        let services = services.clone();
        tokio::spawn(async move { services.run().await })
    };

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    services.shutdown().await;

    // Let a scan in progress finish writing its transcripts
    if let Err(e) = runner.await {
        log::error!("Trigger task failed: {}", e);
    }

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
