use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{ConfigCommand, Engine, PlantCommand, SyncCommand};
use config::Config;
use planta_core::{CacheStorage, HttpRemoteStore, InitOutcome, PlantCache, Reconciler};

#[derive(Parser)]
#[command(name = "planta")]
#[command(version)]
#[command(about = "Keep track of when your houseplants need water", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Plant(PlantCommand),

    /// Reconcile with the remote plant store
    Sync(SyncCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load(cli.config)?;

    match &cli.command {
        Some(Commands::Plant(cmd)) => {
            let mut engine = open_engine(&config)?;
            if config.auto_sync.value {
                refresh(&mut engine).await?;
            }
            cmd.run(&mut engine).await?;
        }
        Some(Commands::Sync(cmd)) => {
            let mut engine = open_engine(&config)?;
            cmd.run(&mut engine, &config).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

fn open_engine(config: &Config) -> Result<Engine, Box<dyn std::error::Error>> {
    let cache = PlantCache::open(CacheStorage::new(config.data_dir.value.clone()))?;
    let remote = HttpRemoteStore::with_timeout(&config.server_url.value, config.request_timeout())?;
    Ok(Reconciler::new(cache, remote))
}

/// Startup refresh. Pending plants go out first so a full refresh does not
/// drop them; an unreachable store only produces a notice.
async fn refresh(engine: &mut Engine) -> Result<(), Box<dyn std::error::Error>> {
    if !engine.pending().is_empty() {
        engine.push_pending().await?;
    }

    if let InitOutcome::Unavailable(e) = engine.initialize().await? {
        tracing::debug!("Startup refresh skipped: {}", e);
        eprintln!("Offline: showing cached plants ({})", e);
    }

    Ok(())
}
