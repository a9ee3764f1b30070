//! Planta Core Library
//!
//! Plant model, watering schedule arithmetic, the local plant cache and the
//! offline-tolerant reconciliation engine shared by the Planta binaries.

pub mod cache;
pub mod engine;
pub mod models;
pub mod remote;
pub mod schedule;

pub use cache::{CacheError, CacheStorage, PlantCache};
pub use engine::{EngineError, InitOutcome, PushReport, Reconciler};
pub use models::{Plant, PlantError, SyncState};
pub use remote::{
    check_server, HttpRemoteStore, NewPlant, PlantListing, RemoteError, RemotePlant, RemoteStore,
};
pub use schedule::{compute_next_due, days_until_due};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
