//! Planta: houseplant watering tracker.
//!
//! The reconciliation engine lives in `planta-core`; this crate hosts the
//! reference remote store served by the `planta-server` binary.

pub mod server;
