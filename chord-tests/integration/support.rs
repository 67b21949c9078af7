//! Shared harness for in-process router tests

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes, to_bytes};
use axum::http::{Method, Request, header};
use axum::response::Response;
use chord_core::catalog::{NewTrack, PrincipalId, SqliteCatalog, Track, TrackCatalog, TrackId};
use chord_core::config::ChordConfig;
use chord_core::storage::test_fixtures::{TestLibrary, create_test_library};
use chord_web::{AppState, build_router};
use serde_json::Value;
use tower::ServiceExt;

/// Router plus the temp library backing it.
pub struct TestServer {
    library: TestLibrary,
    state: AppState,
}

impl TestServer {
    pub async fn start() -> Self {
        let library = create_test_library().await;
        let config =
            ChordConfig::for_testing(library.media_root().to_path_buf(), library.database_url());
        let state = AppState::new(Arc::new(library.catalog().clone()), config);
        Self { library, state }
    }

    pub fn library(&self) -> &TestLibrary {
        &self.library
    }

    pub fn catalog(&self) -> &SqliteCatalog {
        self.library.catalog()
    }

    /// Writes `bytes` under the media root and registers a track for it.
    pub async fn add_track(
        &self,
        file_name: &str,
        bytes: &[u8],
        owner: Option<PrincipalId>,
        is_public: bool,
    ) -> Track {
        self.library.write_media_file(file_name, bytes);
        self.add_track_without_file(file_name, owner, is_public)
            .await
    }

    /// Registers a track whose backing file was never written.
    pub async fn add_track_without_file(
        &self,
        file_name: &str,
        owner: Option<PrincipalId>,
        is_public: bool,
    ) -> Track {
        let mut new_track = NewTrack::new(file_name, file_name);
        new_track.owner_id = owner;
        new_track.is_public = is_public;
        self.catalog().insert_track(new_track).await.unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        build_router(self.state.clone())
            .oneshot(request)
            .await
            .unwrap()
    }

    /// Sends a bodiless request, optionally as `principal`.
    pub async fn call(&self, method: Method, uri: &str, principal: Option<PrincipalId>) -> Response {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(principal) = principal {
            request = request.header("x-chord-user", principal.to_string());
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    /// `GET /api/tracks/{id}/stream`, optionally with a `Range` header.
    pub async fn stream(
        &self,
        id: impl std::fmt::Display,
        range: Option<&str>,
        principal: Option<PrincipalId>,
    ) -> Response {
        let mut request = Request::builder().uri(stream_uri(id));
        if let Some(range) = range {
            request = request.header(header::RANGE, range);
        }
        if let Some(principal) = principal {
            request = request.header("x-chord-user", principal.to_string());
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    pub async fn plays(&self, id: TrackId) -> i64 {
        self.catalog().find_track(id).await.unwrap().unwrap().plays
    }

    /// Polls until `plays` reaches `expected` or two seconds pass.
    pub async fn wait_for_plays(&self, id: TrackId, expected: i64) -> i64 {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let plays = self.plays(id).await;
            if plays >= expected || tokio::time::Instant::now() >= deadline {
                return plays;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Gives any stray increment task time to land.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

pub fn stream_uri(id: impl std::fmt::Display) -> String {
    format!("/api/tracks/{id}/stream")
}

pub async fn body_bytes(response: Response) -> Bytes {
    to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
