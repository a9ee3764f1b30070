//! REST routes for the plant store.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, put},
    Json, Router,
};
use planta_core::models::{validate_interval, validate_name};
use planta_core::remote::{parse_interval, ErrorBody};
use planta_core::RemotePlant;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::storage::PlantStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: PlantStore,
}

/// Builds the API router.
pub fn router(store: PlantStore) -> Router {
    let state = AppState { store };

    Router::new()
        .route("/api/health", get(health))
        .route("/api/plants", get(list_plants).post(create_plant))
        .route("/api/plants/{id}", delete(delete_plant))
        .route("/api/plants/{id}/water", put(water_plant))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Error response carrying the original `{ message, error }` body shape.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                message: message.to_string(),
                error: None,
            },
        }
    }

    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorBody {
                message: "Plant not found".to_string(),
                error: None,
            },
        }
    }

    fn internal(message: &str, e: sqlx::Error) -> Self {
        tracing::error!("{}: {}", message, e);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                message: message.to_string(),
                error: Some(e.to_string()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_plants(State(state): State<AppState>) -> Result<Json<Vec<RemotePlant>>, ApiError> {
    state
        .store
        .list()
        .await
        .map(Json)
        .map_err(|e| ApiError::internal("Error fetching plants", e))
}

/// Create request. Fields stay loose so validation can answer with the
/// store's own messages.
#[derive(Debug, Deserialize)]
struct CreatePlantRequest {
    name: Option<String>,
    interval: Option<Value>,
}

async fn create_plant(
    State(state): State<AppState>,
    Json(request): Json<CreatePlantRequest>,
) -> Result<(StatusCode, Json<RemotePlant>), ApiError> {
    const REQUIRED: &str = "Name and interval are required";
    const NOT_POSITIVE: &str = "Interval must be a positive number";

    let name = request
        .name
        .as_deref()
        .and_then(|name| validate_name(name).ok())
        .ok_or_else(|| ApiError::bad_request(REQUIRED))?;

    let interval = match request.interval.as_ref() {
        None | Some(Value::Null) => return Err(ApiError::bad_request(REQUIRED)),
        Some(Value::String(s)) if s.is_empty() => return Err(ApiError::bad_request(REQUIRED)),
        Some(value) => parse_interval(value),
    };
    let interval = match interval {
        Some(0) => return Err(ApiError::bad_request(REQUIRED)),
        Some(days) => {
            validate_interval(days).map_err(|_| ApiError::bad_request(NOT_POSITIVE))?
        }
        None => return Err(ApiError::bad_request(NOT_POSITIVE)),
    };

    let plant = state
        .store
        .create(&name, interval)
        .await
        .map_err(|e| ApiError::internal("Error creating plant", e))?;
    tracing::debug!("Created plant {:?} ({})", plant.id, plant.name);

    Ok((StatusCode::CREATED, Json(plant)))
}

async fn water_plant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RemotePlant>, ApiError> {
    state
        .store
        .mark_watered(&id)
        .await
        .map_err(|e| ApiError::internal("Error updating plant", e))?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn delete_plant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state
        .store
        .delete(&id)
        .await
        .map_err(|e| ApiError::internal("Error deleting plant", e))?;

    if !deleted {
        return Err(ApiError::not_found());
    }
    Ok(Json(MessageResponse {
        message: "Plant deleted successfully",
    }))
}
