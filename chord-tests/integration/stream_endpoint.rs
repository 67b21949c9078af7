//! Status, headers and bytes of `GET /api/tracks/{id}/stream`

use axum::http::{StatusCode, header};
use chord_core::catalog::TrackId;
use chord_core::storage::test_fixtures::sample_audio_bytes;

use crate::support::{TestServer, body_bytes, body_json};

#[tokio::test]
async fn test_no_range_serves_whole_file() {
    let server = TestServer::start().await;
    let bytes = sample_audio_bytes(5000);
    let track = server.add_track("whole.mp3", &bytes, None, true).await;

    let response = server.stream(track.id, None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_LENGTH], "5000");
    assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
    assert_eq!(headers[header::CONTENT_TYPE], "audio/mpeg");
    assert!(headers.get(header::CONTENT_RANGE).is_none());
    assert_eq!(&body_bytes(response).await[..], &bytes[..]);
}

#[tokio::test]
async fn test_bounded_range_serves_exact_bytes() {
    let server = TestServer::start().await;
    let bytes = sample_audio_bytes(10_000);
    let track = server.add_track("bounded.mp3", &bytes, None, true).await;

    let response = server.stream(track.id, Some("bytes=0-1023"), None).await;

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 0-1023/10000");
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "1024");
    assert_eq!(&body_bytes(response).await[..], &bytes[..1024]);
}

#[tokio::test]
async fn test_open_ended_range() {
    let server = TestServer::start().await;
    let bytes = sample_audio_bytes(1000);
    let track = server.add_track("open.mp3", &bytes, None, true).await;

    let response = server.stream(track.id, Some("bytes=500-"), None).await;

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 500-999/1000");
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "500");
    assert_eq!(&body_bytes(response).await[..], &bytes[500..]);
}

#[tokio::test]
async fn test_suffix_range_longer_than_file_serves_everything() {
    let server = TestServer::start().await;
    let bytes = sample_audio_bytes(1000);
    let track = server.add_track("suffix.mp3", &bytes, None, true).await;

    let response = server.stream(track.id, Some("bytes=-5000"), None).await;

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 0-999/1000");
    assert_eq!(&body_bytes(response).await[..], &bytes[..]);
}

#[tokio::test]
async fn test_range_past_end_is_unsatisfiable() {
    let server = TestServer::start().await;
    let track = server
        .add_track("short.mp3", &sample_audio_bytes(1000), None, true)
        .await;

    for range in ["bytes=2000-3000", "bytes=1000-"] {
        let response = server.stream(track.id, Some(range), None).await;

        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE, "{range}");
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */1000");
        assert!(body_bytes(response).await.is_empty());
    }

    server.settle().await;
    assert_eq!(server.plays(track.id).await, 0);
}

#[tokio::test]
async fn test_split_ranges_reassemble_file() {
    let server = TestServer::start().await;
    let bytes = sample_audio_bytes(4096);
    let track = server.add_track("split.mp3", &bytes, None, true).await;

    for k in [1usize, 100, 2048, 4095] {
        let head = server
            .stream(track.id, Some(&format!("bytes=0-{}", k - 1)), None)
            .await;
        let tail = server
            .stream(track.id, Some(&format!("bytes={k}-4095")), None)
            .await;

        let mut joined = body_bytes(head).await.to_vec();
        joined.extend_from_slice(&body_bytes(tail).await);
        assert_eq!(joined, bytes, "split at {k}");
    }
}

#[tokio::test]
async fn test_malformed_and_multi_range_fall_back_to_full() {
    let server = TestServer::start().await;
    let bytes = sample_audio_bytes(300);
    let track = server.add_track("fallback.mp3", &bytes, None, true).await;

    for range in ["items=0-10", "bytes=abc-def", "bytes=0-10,20-30"] {
        let response = server.stream(track.id, Some(range), None).await;

        assert_eq!(response.status(), StatusCode::OK, "{range}");
        assert_eq!(&body_bytes(response).await[..], &bytes[..], "{range}");
    }
}

#[tokio::test]
async fn test_unknown_track_is_not_found() {
    let server = TestServer::start().await;

    let response = server.stream(TrackId::new_random(), None, None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "Track not found");
}

#[tokio::test]
async fn test_missing_backing_file_is_not_found() {
    let server = TestServer::start().await;
    let track = server.add_track("gone.mp3", &sample_audio_bytes(100), None, true).await;
    std::fs::remove_file(server.library().media_root().join("gone.mp3")).unwrap();

    let response = server.stream(track.id, None, None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "Audio file not found");
}

#[tokio::test]
async fn test_private_track_refused_before_file_access() {
    let server = TestServer::start().await;
    // No backing file: reaching the file check would yield 404, not 403.
    let track = server
        .add_track_without_file("private.mp3", Some(1), false)
        .await;

    let anonymous = server.stream(track.id, None, None).await;
    assert_eq!(anonymous.status(), StatusCode::FORBIDDEN);

    let stranger = server.stream(track.id, None, Some(2)).await;
    assert_eq!(stranger.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(stranger).await["message"],
        "You do not have permission to access this track"
    );

    server.settle().await;
    assert_eq!(server.plays(track.id).await, 0);
}

#[tokio::test]
async fn test_owner_streams_private_track() {
    let server = TestServer::start().await;
    let bytes = sample_audio_bytes(256);
    let track = server.add_track("mine.mp3", &bytes, Some(9), false).await;

    let response = server.stream(track.id, None, Some(9)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&body_bytes(response).await[..], &bytes[..]);
}

#[tokio::test]
async fn test_media_type_follows_file_extension() {
    let server = TestServer::start().await;
    let track = server
        .add_track("lossless.flac", &sample_audio_bytes(64), None, true)
        .await;

    let response = server.stream(track.id, None, None).await;

    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/flac");
}
