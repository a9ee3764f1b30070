//! Remote plant store contract.
//!
//! The engine only depends on [`RemoteStore`]; [`HttpRemoteStore`] binds it
//! to the REST API served by `planta-server`:
//!
//! - `GET    {base}/plants`            list (bare array or `{"plants": [...]}`)
//! - `POST   {base}/plants`            create, echoes the stored record
//! - `PUT    {base}/plants/{id}/water` mark watered
//! - `DELETE {base}/plants/{id}`       delete

mod client;
mod error;
mod protocol;

pub use client::{check_server, HttpRemoteStore};
pub use error::RemoteError;
pub use protocol::{parse_interval, ErrorBody, NewPlant, PlantListing, RemotePlant};

use async_trait::async_trait;

/// Operations the reconciliation engine expects from the authoritative store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list_plants(&self) -> Result<Vec<RemotePlant>, RemoteError>;

    async fn create_plant(&self, plant: &NewPlant) -> Result<RemotePlant, RemoteError>;

    async fn mark_watered(&self, id: &str) -> Result<(), RemoteError>;

    async fn delete_plant(&self, id: &str) -> Result<(), RemoteError>;
}
