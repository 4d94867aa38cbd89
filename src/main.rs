//! SDKWork-Voice server binary
//!
//! Loads the configuration, discovers model bundles and serves the HTTP API.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sdkwork_voice::engine::WorkerLoader;
use sdkwork_voice::model::Device;
use sdkwork_voice::server::{ServerConfig, ServerState, TtsServer};
use sdkwork_voice::training::SystemLauncher;
use sdkwork_voice::VERSION;

/// SDKWork-Voice - multi-model voice synthesis server
#[derive(Parser, Debug)]
#[command(name = "sdkwork-voice")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, default_value = "config.yml")]
    config: PathBuf,

    /// Model directory (overrides `assets_root`)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Use CPU instead of GPU
    #[arg(long)]
    cpu: bool,

    /// Bind host
    #[arg(long)]
    host: Option<String>,

    /// Bind port
    #[arg(long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }
}

fn apply_overrides(config: &mut ServerConfig, cli: &Cli) {
    if let Some(dir) = &cli.dir {
        config.assets_root = dir.clone();
    }
    if cli.cpu {
        config.device = Device::Cpu;
    }
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = ServerConfig::try_load(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
    let found = loaded.is_some();
    let mut config = loaded.unwrap_or_default();
    apply_overrides(&mut config, &cli);
    setup_logging(cli.verbose, &config.logging.level);

    if !found {
        warn!("Config file {:?} not found, using defaults", cli.config);
    }

    info!("SDKWork-Voice v{}", VERSION);
    info!("Device: {}, models: {:?}", config.device, config.assets_root);

    let loader = Arc::new(WorkerLoader::new(&config.worker).context("Failed to create worker client")?);
    let state = Arc::new(ServerState::new(config, loader, Arc::new(SystemLauncher)));

    info!("Loading models...");
    if let Err(e) = state.bootstrap() {
        error!("{}", e);
        std::process::exit(1);
    }

    TtsServer::new(state).run().await.context("Server failed")?;
    Ok(())
}
