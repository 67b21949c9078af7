//! Liveness and catalog statistics

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::server::AppState;

/// Catalog-wide counters.
#[derive(Debug, Serialize)]
pub struct Stats {
    /// Number of stored tracks, public or not
    pub tracks: i64,
}

/// `GET /api/health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /api/stats`
pub async fn stats(State(state): State<AppState>) -> Result<Json<Stats>, ApiError> {
    let tracks = state
        .catalog
        .count_tracks()
        .await
        .map_err(|e| ApiError::internal("Failed to fetch stats", e))?;

    Ok(Json(Stats { tracks }))
}
