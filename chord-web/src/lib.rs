//! Chord Web - JSON API and audio streaming server

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! Serves track metadata as JSON and track audio as byte-range streams.
//! Identity comes from an upstream authentication gateway.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

// Re-export main types
pub use error::ApiError;
pub use server::{AppState, build_router, run_server};
