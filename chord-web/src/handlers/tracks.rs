//! Track metadata endpoints

use axum::Json;
use axum::extract::{Path, Query, State};
use chord_core::catalog::{Track, TrackId, TrackQuery, TrackUpdate};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::auth::RequirePrincipal;
use crate::error::ApiError;
use crate::server::AppState;

/// Track as returned to API clients, with its stream URL attached.
#[derive(Debug, Serialize)]
pub struct TrackView {
    #[serde(flatten)]
    track: Track,
    url: String,
}

impl TrackView {
    fn new(state: &AppState, track: Track) -> Self {
        Self {
            url: state.stream_url(track.id),
            track,
        }
    }

    fn many(state: &AppState, tracks: Vec<Track>) -> Vec<Self> {
        tracks.into_iter().map(|t| Self::new(state, t)).collect()
    }
}

/// Looks up `id`, mapping an unparseable id to "not found".
async fn load_track(state: &AppState, id: &str, failure: &'static str) -> Result<Track, ApiError> {
    let not_found = || ApiError::TrackNotFound { id: id.to_string() };
    let track_id: TrackId = id.parse().map_err(|_| not_found())?;

    state
        .catalog
        .find_track(track_id)
        .await
        .map_err(|e| ApiError::internal(failure, e))?
        .ok_or_else(not_found)
}

/// `GET /api/tracks` - public tracks, newest first.
pub async fn list_tracks(
    State(state): State<AppState>,
    RequirePrincipal(_principal): RequirePrincipal,
    Query(query): Query<TrackQuery>,
) -> Result<Json<Value>, ApiError> {
    let tracks = state
        .catalog
        .list_public_tracks(&query)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch tracks", e))?;

    let total = tracks.len();
    Ok(Json(json!({
        "tracks": TrackView::many(&state, tracks),
        "total": total,
        "query": query.query,
        "genre": query.genre,
    })))
}

/// `GET /api/tracks/my-tracks` - every track the caller uploaded.
pub async fn list_my_tracks(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> Result<Json<Value>, ApiError> {
    let tracks = state
        .catalog
        .tracks_by_owner(principal.id)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch your tracks", e))?;

    Ok(Json(json!({ "tracks": TrackView::many(&state, tracks) })))
}

/// `GET /api/tracks/{id}`
pub async fn get_track(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let track = load_track(&state, &id, "Failed to fetch track").await?;
    if !track.is_visible_to(Some(principal.id)) {
        return Err(ApiError::Forbidden { action: "access" });
    }

    Ok(Json(json!({ "track": TrackView::new(&state, track) })))
}

/// `PUT /api/tracks/{id}` - owner-only metadata edit.
pub async fn update_track(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
    Json(mut update): Json<TrackUpdate>,
) -> Result<Json<Value>, ApiError> {
    let track = load_track(&state, &id, "Failed to update track").await?;
    if !track.is_owned_by(Some(principal.id)) {
        return Err(ApiError::Forbidden { action: "modify" });
    }

    // An empty title keeps the current one.
    update.title = update.title.filter(|title| !title.trim().is_empty());

    let updated = state
        .catalog
        .update_track(track.id, update)
        .await
        .map_err(|e| ApiError::internal("Failed to update track", e))?
        .ok_or_else(|| ApiError::TrackNotFound { id: id.clone() })?;

    Ok(Json(json!({
        "message": "Track updated successfully",
        "track": TrackView::new(&state, updated),
    })))
}

/// `DELETE /api/tracks/{id}` - owner or admin; removes the row, then the file.
pub async fn delete_track(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let track = load_track(&state, &id, "Failed to delete track").await?;
    if !track.is_owned_by(Some(principal.id)) && !principal.is_admin {
        return Err(ApiError::Forbidden { action: "delete" });
    }

    let Some(deleted) = state
        .catalog
        .delete_track(track.id)
        .await
        .map_err(|e| ApiError::internal("Failed to delete track", e))?
    else {
        return Err(ApiError::TrackNotFound { id });
    };

    // The row is gone either way; a leftover file is only worth a warning.
    if let Err(e) = state.media.remove(&deleted.file_path).await {
        warn!("Failed to remove audio file for track {}: {}", deleted.id, e);
    }
    info!("Track {} deleted by principal {}", deleted.id, principal.id);

    Ok(Json(json!({ "message": "Track deleted successfully" })))
}

/// `POST /api/tracks/{id}/play` - explicit play count increment.
pub async fn record_play(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let track = load_track(&state, &id, "Failed to update play count").await?;
    if !track.is_visible_to(Some(principal.id)) {
        return Err(ApiError::Forbidden { action: "access" });
    }

    let plays = state
        .catalog
        .increment_play_count(track.id)
        .await
        .map_err(|e| ApiError::internal("Failed to update play count", e))?
        .ok_or_else(|| ApiError::TrackNotFound { id: id.clone() })?;

    Ok(Json(json!({ "message": "Play count updated", "plays": plays })))
}
