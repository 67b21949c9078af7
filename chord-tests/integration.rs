//! Integration tests for Chord
//!
//! Drive the full axum router in-process against a real SQLite catalog and
//! media root in a temporary directory.

#[path = "integration/support.rs"]
mod support;

#[path = "integration/stream_endpoint.rs"]
mod stream_endpoint;

#[path = "integration/play_count.rs"]
mod play_count;

#[path = "integration/track_api.rs"]
mod track_api;
