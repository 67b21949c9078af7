//! Byte-range audio streaming endpoint

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, header};
use axum::response::Response;
use chord_core::catalog::{Track, TrackId};
use chord_core::streaming::{MediaFile, RangeOutcome, parse_range_header};
use tracing::{debug, warn};

use super::range::{build_stream_response, build_unsatisfiable_response};
use crate::auth::MaybePrincipal;
use crate::error::ApiError;
use crate::server::AppState;

/// Streams a track's audio, honouring a single `Range` header.
///
/// Checks run in a fixed order: the track must exist (404), the caller must
/// be allowed to hear it (403) and its backing file must exist (404). Only
/// then is the range interpreted: 416 for a range outside the file, 206 for
/// a satisfiable range and 200 otherwise. A 200 or 206 GET counts one play
/// without waiting for the increment.
///
/// # Errors
/// Returns the matching [`ApiError`] for each refused request, or an
/// internal error if the file exists but cannot be read.
pub async fn stream_track(
    State(state): State<AppState>,
    Path(id): Path<String>,
    principal: MaybePrincipal,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let track = find_streamable_track(&state, &id, principal).await?;
    let media_file = open_media_file(&state, &track).await?;
    let file_size = media_file.size();

    let range_header = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    let range = match parse_range_header(range_header, file_size) {
        RangeOutcome::Unsatisfiable => {
            debug!(
                "Unsatisfiable range {:?} for track {} ({} bytes)",
                range_header, track.id, file_size
            );
            return build_unsatisfiable_response(file_size);
        }
        RangeOutcome::Partial(range) => Some(range),
        RangeOutcome::Full => None,
    };

    let stream = media_file
        .into_stream(range, state.config.storage.stream_chunk_size)
        .await
        .map_err(|e| ApiError::internal("Failed to stream track", e))?;

    let response = build_stream_response(
        &track.resolved_media_type(),
        range,
        file_size,
        Body::from_stream(stream),
    )?;

    match range {
        Some(range) => debug!("Serving bytes {} of track {}", range, track.id),
        None => debug!("Serving all {} bytes of track {}", file_size, track.id),
    }

    if method != Method::HEAD {
        state.plays.record_play(track.id);
    }

    Ok(response)
}

async fn find_streamable_track(
    state: &AppState,
    id: &str,
    principal: MaybePrincipal,
) -> Result<Track, ApiError> {
    let not_found = || ApiError::TrackNotFound { id: id.to_string() };

    let track_id: TrackId = id.parse().map_err(|_| not_found())?;
    let track = state
        .catalog
        .find_track(track_id)
        .await
        .map_err(|e| ApiError::internal("Failed to stream track", e))?
        .ok_or_else(not_found)?;

    if !track.is_visible_to(principal.id()) {
        debug!(
            "Refusing private track {} to {:?}",
            track.id,
            principal.id()
        );
        return Err(ApiError::Forbidden { action: "access" });
    }

    Ok(track)
}

async fn open_media_file(state: &AppState, track: &Track) -> Result<MediaFile, ApiError> {
    let path = state
        .media
        .resolve(&track.file_path)
        .map_err(|e| ApiError::internal("Failed to stream track", e))?;

    match MediaFile::open(&path).await {
        Ok(file) => Ok(file),
        Err(e) if e.is_missing_file() => {
            warn!("Audio file for track {} missing at {}", track.id, path.display());
            Err(ApiError::AudioFileMissing { id: track.id })
        }
        Err(e) => Err(ApiError::internal("Failed to stream track", e)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::to_bytes;
    use axum::http::{Request, StatusCode};
    use chord_core::catalog::{NewTrack, TrackCatalog};
    use chord_core::config::ChordConfig;
    use chord_core::storage::test_fixtures::{create_test_library, sample_audio_bytes};
    use tower::ServiceExt;

    use crate::server::build_router;

    use super::*;

    async fn get(state: AppState, uri: &str, range: Option<&str>) -> Response {
        let mut request = Request::builder().uri(uri);
        if let Some(range) = range {
            request = request.header(header::RANGE, range);
        }
        build_router(state)
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_invalid_id_is_not_found() {
        let library = create_test_library().await;
        let config = ChordConfig::for_testing(
            library.media_root().to_path_buf(),
            library.database_url(),
        );
        let state = AppState::new(Arc::new(library.catalog().clone()), config);

        let response = get(state, "/api/tracks/not-a-uuid/stream", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_head_request_does_not_count_play() {
        let library = create_test_library().await;
        library.write_media_file("song.mp3", &sample_audio_bytes(1000));
        let track = library
            .catalog()
            .insert_track(NewTrack::new("song", "song.mp3"))
            .await
            .unwrap();

        let config = ChordConfig::for_testing(
            library.media_root().to_path_buf(),
            library.database_url(),
        );
        let state = AppState::new(Arc::new(library.catalog().clone()), config);

        let response = build_router(state)
            .oneshot(
                Request::builder()
                    .method(Method::HEAD)
                    .uri(format!("/api/tracks/{}/stream", track.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "1000");

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let stored = library.catalog().find_track(track.id).await.unwrap().unwrap();
        assert_eq!(stored.plays, 0);
    }

    #[tokio::test]
    async fn test_suffix_range_returns_tail() {
        let library = create_test_library().await;
        let bytes = sample_audio_bytes(1000);
        library.write_media_file("tail.mp3", &bytes);
        let track = library
            .catalog()
            .insert_track(NewTrack::new("tail", "tail.mp3"))
            .await
            .unwrap();

        let config = ChordConfig::for_testing(
            library.media_root().to_path_buf(),
            library.database_url(),
        );
        let state = AppState::new(Arc::new(library.catalog().clone()), config);

        let uri = format!("/api/tracks/{}/stream", track.id);
        let response = get(state, &uri, Some("bytes=-100")).await;
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 900-999/1000");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], &bytes[900..]);
    }
}
