//! Track metadata endpoints and system routes

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chord_core::catalog::TrackCatalog;
use chord_core::storage::test_fixtures::sample_audio_bytes;
use serde_json::json;

use crate::support::{TestServer, body_json};

fn json_request(method: Method, uri: &str, principal: i64, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-chord-user", principal.to_string())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_and_stats_need_no_principal() {
    let server = TestServer::start().await;
    server.add_track("a.mp3", &sample_audio_bytes(8), None, true).await;
    server.add_track("b.mp3", &sample_audio_bytes(8), Some(1), false).await;

    let health = server.call(Method::GET, "/api/health", None).await;
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(body_json(health).await, json!({ "status": "ok" }));

    let stats = server.call(Method::GET, "/api/stats", None).await;
    assert_eq!(body_json(stats).await["tracks"], 2);
}

#[tokio::test]
async fn test_list_shows_public_tracks_with_stream_urls() {
    let server = TestServer::start().await;
    let public = server.add_track("open.mp3", &sample_audio_bytes(8), Some(1), true).await;
    server.add_track("hidden.mp3", &sample_audio_bytes(8), Some(1), false).await;

    let response = server.call(Method::GET, "/api/tracks", Some(2)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["query"], serde_json::Value::Null);
    let listed = &json["tracks"][0];
    assert_eq!(listed["id"], public.id.to_string());
    assert_eq!(
        listed["url"],
        format!("http://localhost:3002/api/tracks/{}/stream", public.id)
    );
    assert!(listed.get("file_path").is_none());
}

#[tokio::test]
async fn test_list_requires_principal() {
    let server = TestServer::start().await;

    let response = server.call(Method::GET, "/api/tracks", None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Authentication required");
}

#[tokio::test]
async fn test_my_tracks_includes_private_uploads() {
    let server = TestServer::start().await;
    server.add_track("mine-public.mp3", &sample_audio_bytes(8), Some(5), true).await;
    server.add_track("mine-private.mp3", &sample_audio_bytes(8), Some(5), false).await;
    server.add_track("theirs.mp3", &sample_audio_bytes(8), Some(6), true).await;

    let response = server.call(Method::GET, "/api/tracks/my-tracks", Some(5)).await;

    let json = body_json(response).await;
    assert_eq!(json["tracks"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_get_track_applies_visibility() {
    let server = TestServer::start().await;
    let track = server.add_track("secret.mp3", &sample_audio_bytes(8), Some(1), false).await;
    let uri = format!("/api/tracks/{}", track.id);

    let owner = server.call(Method::GET, &uri, Some(1)).await;
    assert_eq!(owner.status(), StatusCode::OK);
    assert_eq!(body_json(owner).await["track"]["title"], "secret.mp3");

    let stranger = server.call(Method::GET, &uri, Some(2)).await;
    assert_eq!(stranger.status(), StatusCode::FORBIDDEN);

    let malformed = server.call(Method::GET, "/api/tracks/nope", Some(1)).await;
    assert_eq!(malformed.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_is_owner_only() {
    let server = TestServer::start().await;
    let track = server.add_track("draft.mp3", &sample_audio_bytes(8), Some(1), true).await;
    let uri = format!("/api/tracks/{}", track.id);

    let refused = server
        .send(json_request(Method::PUT, &uri, 2, json!({ "title": "stolen" })))
        .await;
    assert_eq!(refused.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(refused).await["message"],
        "You do not have permission to modify this track"
    );

    let accepted = server
        .send(json_request(
            Method::PUT,
            &uri,
            1,
            json!({ "title": "Final Mix", "genre": "ambient", "is_public": false }),
        ))
        .await;
    assert_eq!(accepted.status(), StatusCode::OK);

    let json = body_json(accepted).await;
    assert_eq!(json["message"], "Track updated successfully");
    assert_eq!(json["track"]["title"], "Final Mix");
    assert_eq!(json["track"]["genre"], "ambient");
    assert_eq!(json["track"]["is_public"], false);
}

#[tokio::test]
async fn test_delete_by_admin_removes_row_and_file() {
    let server = TestServer::start().await;
    let track = server.add_track("doomed.mp3", &sample_audio_bytes(8), Some(1), true).await;
    let file = server.library().media_root().join("doomed.mp3");
    let uri = format!("/api/tracks/{}", track.id);

    let refused = server.call(Method::DELETE, &uri, Some(2)).await;
    assert_eq!(refused.status(), StatusCode::FORBIDDEN);
    assert!(file.exists());

    let admin = Request::builder()
        .method(Method::DELETE)
        .uri(&uri)
        .header("x-chord-user", "2")
        .header("x-chord-role", "admin")
        .body(Body::empty())
        .unwrap();
    let response = server.send(admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Track deleted successfully");

    assert!(server.catalog().find_track(track.id).await.unwrap().is_none());
    assert!(!file.exists());
}

#[tokio::test]
async fn test_owner_delete_tolerates_missing_file() {
    let server = TestServer::start().await;
    let track = server.add_track_without_file("never-uploaded.mp3", Some(3), true).await;

    let response = server
        .call(Method::DELETE, &format!("/api/tracks/{}", track.id), Some(3))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
}
