//! Sync CLI commands for reconciling with the remote plant store.

use clap::{Args, Subcommand};
use std::io::{self, Write};
use std::time::Duration;

use super::Engine;
use crate::config::Config;
use planta_core::{check_server, InitOutcome};

/// Reconcile with the remote plant store
#[derive(Debug, Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Debug, Subcommand)]
enum SyncSubcommand {
    /// Show sync configuration and server status
    Status,
}

impl SyncCommand {
    pub async fn run(
        &self,
        engine: &mut Engine,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            None => self.sync(engine).await,
            Some(SyncSubcommand::Status) => self.status(engine, config).await,
        }
    }

    async fn sync(&self, engine: &mut Engine) -> Result<(), Box<dyn std::error::Error>> {
        println!("Syncing with {}...", engine.remote().base_url());
        println!();

        let pending = engine.pending().len();
        if pending > 0 {
            let report = engine.push_pending().await?;
            println!(
                "  {} pushed {} pending plant(s): {} created, {} watered, {} failed",
                if report.failed == 0 { "✓" } else { "✗" },
                pending,
                report.created,
                report.watered,
                report.failed
            );
        }

        match engine.initialize().await? {
            InitOutcome::Synced(count) => {
                println!("  ✓ refreshed {} plant(s) from server", count);
            }
            InitOutcome::RemoteEmpty => {
                println!("  ✓ server has no plants, kept {} local", engine.plants().len());
            }
            InitOutcome::Unavailable(e) => {
                println!("  ✗ server unavailable: {}", e);
            }
        }

        println!();
        let still_pending = engine.pending().len();
        if still_pending == 0 {
            println!("Sync complete.");
        } else {
            println!("{} plant(s) still waiting to sync.", still_pending);
        }

        Ok(())
    }

    async fn status(
        &self,
        engine: &Engine,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        println!("Server:    {}", engine.remote().base_url());
        println!(
            "Auto-sync: {}",
            if config.auto_sync.value {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!("Cache:     {}", config.data_dir.value.display());
        println!();

        let pending = engine.pending();
        println!("Plants:  {} ({} pending)", engine.plants().len(), pending.len());
        for plant in &pending {
            println!("  - {}: {}", plant.name, plant.sync);
        }
        println!();

        let timeout = config.request_timeout().unwrap_or(Duration::from_secs(5));
        print!("Server status: ");
        io::stdout().flush()?;
        if check_server(engine.remote().base_url(), timeout).await {
            println!("✓ connected");
        } else {
            println!("✗ unreachable");
        }

        Ok(())
    }
}
