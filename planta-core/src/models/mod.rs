mod plant;

pub use plant::{validate_interval, validate_name, Plant, PlantError, SyncState};
