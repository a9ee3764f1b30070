use clap::ValueEnum;
use planta_core::{HttpRemoteStore, Reconciler};

mod config_cmd;
mod plant;
mod sync_cmd;

pub use config_cmd::ConfigCommand;
pub use plant::PlantCommand;
pub use sync_cmd::SyncCommand;

/// Engine wired to the HTTP remote store.
pub type Engine = Reconciler<HttpRemoteStore>;

#[derive(Clone, Debug, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
