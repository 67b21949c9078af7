//! Play counting driven by streaming and the explicit play endpoint

use axum::http::{Method, StatusCode};
use chord_core::catalog::TrackCatalog;
use chord_core::storage::test_fixtures::sample_audio_bytes;
use futures::future::join_all;

use crate::support::{TestServer, body_bytes, body_json};

#[tokio::test]
async fn test_full_and_partial_streams_each_count_once() {
    let server = TestServer::start().await;
    let track = server
        .add_track("counted.mp3", &sample_audio_bytes(2000), None, true)
        .await;

    let full = server.stream(track.id, None, None).await;
    assert_eq!(full.status(), StatusCode::OK);
    body_bytes(full).await;
    assert_eq!(server.wait_for_plays(track.id, 1).await, 1);

    let partial = server.stream(track.id, Some("bytes=0-99"), None).await;
    assert_eq!(partial.status(), StatusCode::PARTIAL_CONTENT);
    body_bytes(partial).await;
    assert_eq!(server.wait_for_plays(track.id, 2).await, 2);
}

#[tokio::test]
async fn test_concurrent_streams_lose_no_plays() {
    const STREAMS: usize = 32;

    let server = TestServer::start().await;
    let bytes = sample_audio_bytes(4096);
    let track = server.add_track("popular.mp3", &bytes, None, true).await;
    let id = track.id;

    let responses = join_all((0..STREAMS).map(|i| {
        let range = (i % 2 == 0).then(|| format!("bytes={i}-"));
        let server = &server;
        async move {
            let response = server.stream(id, range.as_deref(), None).await;
            let status = response.status();
            (status, body_bytes(response).await.len())
        }
    }))
    .await;

    for (i, (status, len)) in responses.into_iter().enumerate() {
        if i % 2 == 0 {
            assert_eq!(status, StatusCode::PARTIAL_CONTENT);
            assert_eq!(len, bytes.len() - i);
        } else {
            assert_eq!(status, StatusCode::OK);
            assert_eq!(len, bytes.len());
        }
    }

    let plays = server.wait_for_plays(id, STREAMS as i64).await;
    assert_eq!(plays, STREAMS as i64);
}

#[tokio::test]
async fn test_missing_file_does_not_count() {
    let server = TestServer::start().await;
    let track = server.add_track_without_file("ghost.mp3", None, true).await;

    let response = server.stream(track.id, None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    server.settle().await;
    assert_eq!(server.plays(track.id).await, 0);
}

#[tokio::test]
async fn test_track_deleted_mid_stream_keeps_response_intact() {
    let server = TestServer::start().await;
    let bytes = sample_audio_bytes(1024);
    let track = server.add_track("fleeting.mp3", &bytes, None, true).await;

    let response = server.stream(track.id, None, None).await;
    server.catalog().delete_track(track.id).await.unwrap();

    // The increment may find no row; the client never learns about it.
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&body_bytes(response).await[..], &bytes[..]);
}

#[tokio::test]
async fn test_play_endpoint_increments_atomically() {
    let server = TestServer::start().await;
    let track = server
        .add_track("manual.mp3", &sample_audio_bytes(10), Some(1), true)
        .await;
    let uri = format!("/api/tracks/{}/play", track.id);

    let first = server.call(Method::POST, &uri, Some(1)).await;
    assert_eq!(first.status(), StatusCode::OK);
    let json = body_json(first).await;
    assert_eq!(json["message"], "Play count updated");
    assert_eq!(json["plays"], 1);

    let second = server.call(Method::POST, &uri, Some(2)).await;
    assert_eq!(body_json(second).await["plays"], 2);
}

#[tokio::test]
async fn test_play_endpoint_requires_principal() {
    let server = TestServer::start().await;
    let track = server
        .add_track("anon.mp3", &sample_audio_bytes(10), None, true)
        .await;

    let response = server
        .call(Method::POST, &format!("/api/tracks/{}/play", track.id), None)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(server.plays(track.id).await, 0);
}
