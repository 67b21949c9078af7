//! JSON API and streaming server for Chord
//!
//! Wires the catalog, media store and play counter into an axum router.

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use chord_core::catalog::{SqliteCatalog, TrackCatalog};
use chord_core::config::ChordConfig;
use chord_core::plays::PlayCounter;
use chord_core::storage::MediaStore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::identify_principal;
use crate::handlers::{
    delete_track, get_track, health, list_my_tracks, list_tracks, record_play, stats,
    stream_track, update_track,
};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Track metadata store
    pub catalog: Arc<dyn TrackCatalog>,
    /// Resolver for backing media files
    pub media: MediaStore,
    /// Fire-and-forget play-count dispatcher
    pub plays: PlayCounter,
    /// Effective configuration
    pub config: Arc<ChordConfig>,
}

impl AppState {
    /// Builds state around an existing catalog.
    pub fn new(catalog: Arc<dyn TrackCatalog>, config: ChordConfig) -> Self {
        Self {
            media: MediaStore::new(config.storage.media_root.clone()),
            plays: PlayCounter::new(Arc::clone(&catalog)),
            catalog,
            config: Arc::new(config),
        }
    }

    /// Absolute URL clients use to stream `track_id`.
    pub fn stream_url(&self, track_id: impl std::fmt::Display) -> String {
        format!(
            "{}/api/tracks/{}/stream",
            self.config.server.public_url.trim_end_matches('/'),
            track_id
        )
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("media", &self.media)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builds the full API router.
pub fn build_router(state: AppState) -> Router {
    let auth = Arc::new(state.config.auth.clone());

    Router::new()
        // Track catalog
        .route("/api/tracks", get(list_tracks))
        .route("/api/tracks/my-tracks", get(list_my_tracks))
        .route(
            "/api/tracks/{id}",
            get(get_track).put(update_track).delete(delete_track),
        )
        .route("/api/tracks/{id}/play", post(record_play))
        // Audio streaming
        .route("/api/tracks/{id}/stream", get(stream_track))
        // System
        .route("/api/health", get(health))
        .route("/api/stats", get(stats))
        .layer(middleware::from_fn_with_state(auth, identify_principal))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Opens the catalog described by `config` and serves until the listener fails.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the address cannot be bound.
pub async fn run_server(config: ChordConfig) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = SqliteCatalog::connect(
        &config.storage.database_url,
        config.storage.max_connections,
    )
    .await?;
    tokio::fs::create_dir_all(&config.storage.media_root).await?;

    let bind_address = config.server.bind_address();
    let state = AppState::new(Arc::new(catalog), config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Chord server running on http://{}", bind_address);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chord_core::storage::test_fixtures::create_test_library;

    use super::*;

    #[tokio::test]
    async fn test_stream_url_uses_public_url() {
        let library = create_test_library().await;
        let mut config =
            ChordConfig::for_testing(PathBuf::from(library.media_root()), library.database_url());
        config.server.public_url = "https://music.example.com/".to_string();

        let state = AppState::new(Arc::new(library.catalog().clone()), config);
        assert_eq!(
            state.stream_url("abc"),
            "https://music.example.com/api/tracks/abc/stream"
        );
    }
}
