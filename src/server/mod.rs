//! Reference remote store served by `planta-server`.

pub mod routes;
pub mod storage;

pub use routes::{router, ApiError, AppState};
pub use storage::PlantStore;
