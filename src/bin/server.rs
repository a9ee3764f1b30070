//! Planta Server
//!
//! Reference remote store for Planta clients. Keeps plants in SQLite and
//! serves them over a small REST API.
//!
//! # Configuration
//!
//! Environment variables:
//! - `PLANTA_PORT`: Port to listen on (default: 5000)
//! - `PLANTA_DATABASE_PATH`: SQLite database file (default: ~/.local/share/planta-server/plants.db)
//!
//! # Endpoints
//!
//! - `GET /api/health`: Health check
//! - `GET /api/plants`: List plants
//! - `POST /api/plants`: Create a plant (`{"name": "Fern", "interval": 3}`)
//! - `PUT /api/plants/{id}/water`: Mark a plant as watered now
//! - `DELETE /api/plants/{id}`: Delete a plant

use std::net::SocketAddr;
use std::path::PathBuf;

use planta::server::{router, PlantStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Server configuration
#[derive(Debug, Clone)]
struct Config {
    /// Port to listen on
    port: u16,
    /// SQLite database file
    database_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let port = std::env::var("PLANTA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);

        let database_path = std::env::var("PLANTA_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("planta-server")
                    .join("plants.db")
            });

        Self {
            port,
            database_path,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "planta_server=info,planta=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!("Database: {}", config.database_path.display());

    let store = match PlantStore::open(&config.database_path).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let app = router(store);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Starting server on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
