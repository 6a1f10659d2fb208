//! volume-mirror - interactive driver for the volume cache
//!
//! Runs a [`VolumeMirror`] against a simulated audio surface and logs
//! every change seen by the watched channels.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use volume_mirror::cli::{self, Console};
use volume_mirror::{LocalChangeSource, MirrorConfig, VolumeMirror};

/// Volume Mirror - cached view of per-channel volume, mute and ringer mode
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (built-in defaults if missing)
    #[arg(short, long, default_value = "volume-mirror.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Run commands from a file instead of the interactive prompt
    #[arg(short, long)]
    script: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Starting volume-mirror...");

    let config = if Path::new(&args.config).exists() {
        info!("Configuration file: {}", args.config);
        MirrorConfig::load(&args.config).await?
    } else {
        info!("No configuration at {}, using built-in defaults", args.config);
        MirrorConfig::default()
    };

    let events = Arc::new(LocalChangeSource::new("simulated-broadcast"));
    let surface = Arc::new(config.build_surface(events.clone()));

    let mirror = Arc::new(VolumeMirror::new());
    mirror.initialize(surface.clone(), events)?;

    spawn_watchers(&mirror, &config);

    let console = Console::new(mirror.clone(), surface);
    let script = match &args.script {
        Some(path) => Some(tokio::fs::read_to_string(path).await?),
        None => None,
    };

    let session = tokio::task::spawn_blocking(move || -> Result<()> {
        match script {
            Some(contents) => {
                console.run_script(&contents);
                Ok(())
            }
            None => cli::run_repl(&console),
        }
    });

    tokio::select! {
        result = session => result??,
        _ = shutdown_signal() => {}
    }

    mirror.shutdown();
    info!("volume-mirror shutdown complete");
    Ok(())
}

/// Log every value seen by the watched channels and the ringer mode
fn spawn_watchers(mirror: &VolumeMirror, config: &MirrorConfig) {
    for &channel in &config.watch {
        match mirror.subscribe_volume(channel) {
            Ok(handle) => {
                tokio::spawn(async move {
                    let mut values = handle.into_stream();
                    while let Some(volume) = values.next().await {
                        info!("📢 {} volume = {}", channel, volume);
                    }
                });
            }
            Err(e) => warn!("Cannot watch {}: {}", channel, e),
        }
    }

    match mirror.subscribe_ringer_mode() {
        Ok(handle) => {
            tokio::spawn(async move {
                let mut modes = handle.into_stream();
                while let Some(mode) = modes.next().await {
                    info!("🔔 ringer mode = {}", mode);
                }
            });
        }
        Err(e) => warn!("Cannot watch ringer mode: {}", e),
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
