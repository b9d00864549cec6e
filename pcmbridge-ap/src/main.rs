//! pcmbridge Audio Player (pcmbridge-ap) - Main entry point
//!
//! Opens an audio context, starts one producer per player writing silence,
//! and logs drain notifications until the run time elapses or a shutdown
//! signal arrives.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use pcmbridge_ap::config::{Config, Overrides};
use pcmbridge_ap::{AudioContext, PlayerEvent, PlayerId, SleepPacer, WriteOutcome};
use pcmbridge_common::config::{AudioConfig, ConfigSource, LoggingConfig, TomlConfig};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "pcmbridge_ap=info,pcmbridge_common=info";

/// Command-line arguments for pcmbridge-ap
#[derive(Parser, Debug)]
#[command(name = "pcmbridge-ap")]
#[command(about = "Paced PCM output pipeline with per-player playback threads")]
#[command(version)]
struct Args {
    /// Config file (overrides PCMBRIDGE_CONFIG and the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sample rate in Hz
    #[arg(long, env = "PCMBRIDGE_SAMPLE_RATE")]
    sample_rate: Option<u32>,

    /// Interleaved channel count
    #[arg(long, env = "PCMBRIDGE_CHANNELS")]
    channels: Option<u32>,

    /// Bytes per sample per channel
    #[arg(long, env = "PCMBRIDGE_BYTES_PER_SAMPLE")]
    bytes_per_sample: Option<u32>,

    /// Bytes consumed per playback period (default: half a second of audio)
    #[arg(long, env = "PCMBRIDGE_QUANTUM")]
    quantum: Option<u64>,

    /// Number of players to create
    #[arg(long, default_value = "1")]
    players: usize,

    /// Seconds to run before shutting down
    #[arg(long, default_value = "5")]
    seconds: u64,

    /// Bytes per producer write
    #[arg(long, default_value = "4096")]
    chunk_bytes: usize,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            config_path: self.config.clone(),
            sample_rate_hz: self.sample_rate,
            channel_count: self.channels,
            bytes_per_sample: self.bytes_per_sample,
            quantum_bytes: self.quantum,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.overrides()).context("Failed to resolve configuration")?;

    if args.print_config {
        print!("{}", effective_toml(&config)?);
        return Ok(());
    }

    let default_filter = match config.source {
        ConfigSource::File(_) => config.log_level.clone(),
        ConfigSource::Defaults => DEFAULT_LOG_FILTER.to_string(),
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "pcmbridge-ap {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("PCMBRIDGE_GIT_HASH"),
        env!("PCMBRIDGE_BUILD_TIMESTAMP"),
        env!("PCMBRIDGE_BUILD_PROFILE"),
    );
    match &config.source {
        ConfigSource::File(path) => info!("Configuration: {}", path.display()),
        ConfigSource::Defaults => {
            if let Some(path) = &args.config {
                warn!("Config file {} not usable, using defaults", path.display());
            }
            info!("Configuration: compiled defaults");
        }
    }

    let ctx = Arc::new(
        AudioContext::open_with(config.format, Some(config.quantum_bytes), Arc::new(SleepPacer))
            .context("Failed to open audio context")?,
    );

    let event_task = tokio::spawn(log_events(ctx.registry().subscribe()));

    let stop = Arc::new(AtomicBool::new(false));
    let chunk = Arc::new(vec![0u8; args.chunk_bytes.max(1)]);
    let mut producers = Vec::with_capacity(args.players);
    for _ in 0..args.players {
        let id = ctx.create_player().context("Failed to create player")?;
        let ctx = Arc::clone(&ctx);
        let stop = Arc::clone(&stop);
        let chunk = Arc::clone(&chunk);
        producers.push((
            id,
            tokio::task::spawn_blocking(move || produce_silence(&ctx, id, &chunk, &stop)),
        ));
    }
    info!(
        "{} players running for {}s ({}-byte writes)",
        args.players, args.seconds, args.chunk_bytes
    );

    tokio::select! {
        _ = shutdown_signal() => {},
        _ = tokio::time::sleep(Duration::from_secs(args.seconds)) => {
            info!("Run time elapsed, shutting down");
        },
    }

    // Closing unblocks any producer parked in write
    stop.store(true, Ordering::Release);
    let closing = Arc::clone(&ctx);
    tokio::task::spawn_blocking(move || closing.close())
        .await
        .context("Audio context close task failed")?;

    for (id, producer) in producers {
        let written = producer.await.context("Producer task failed")?;
        info!("{} producer wrote {} bytes", id, written);
    }

    // Last reference: dropping the context drops the event bus, ending the log task
    tokio::task::spawn_blocking(move || drop(ctx))
        .await
        .context("Audio context drop task failed")?;
    event_task.await.context("Event task failed")?;

    info!("Shutdown complete");
    Ok(())
}

/// Write silence until stopped or the player closes; returns bytes written
fn produce_silence(ctx: &AudioContext, id: PlayerId, chunk: &[u8], stop: &AtomicBool) -> u64 {
    let mut written = 0u64;
    while !stop.load(Ordering::Acquire) {
        match ctx.registry().write(id, chunk) {
            Ok(WriteOutcome::Written) => written += chunk.len() as u64,
            Ok(WriteOutcome::Closed) => break,
            Err(e) => {
                debug!("{} producer stopping: {}", id, e);
                break;
            }
        }
    }
    written
}

async fn log_events(mut rx: tokio::sync::broadcast::Receiver<PlayerEvent>) {
    let mut drained: HashMap<PlayerId, u64> = HashMap::new();
    loop {
        match rx.recv().await {
            Ok(PlayerEvent::QuantumDrained {
                player_id,
                bytes,
                pending_bytes,
                ..
            }) => {
                *drained.entry(player_id).or_default() += bytes;
                debug!(
                    "{} played {} bytes ({} pending)",
                    player_id, bytes, pending_bytes
                );
            }
            Ok(PlayerEvent::PlayerClosed {
                player_id,
                unplayed_bytes,
                ..
            }) => {
                info!(
                    "{} closed: {} bytes played, {} unplayed",
                    player_id,
                    drained.get(&player_id).copied().unwrap_or(0),
                    unplayed_bytes
                );
            }
            Ok(event) => debug!("{:?}", event),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event log lagged, {} events skipped", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Effective configuration rendered as a config file
fn effective_toml(config: &Config) -> Result<String> {
    let toml_config = TomlConfig {
        audio: AudioConfig {
            sample_rate_hz: config.format.sample_rate_hz,
            channel_count: config.format.channel_count,
            bytes_per_sample: config.format.bytes_per_sample,
            buffer_quantum_bytes: Some(config.quantum_bytes),
        },
        logging: LoggingConfig {
            level: config.log_level.clone(),
        },
    };
    toml::to_string(&toml_config).context("Failed to render configuration")
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
