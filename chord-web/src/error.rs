//! HTTP-facing error taxonomy
//!
//! Every failure a handler can hit maps to exactly one status code here, so
//! nothing that deserves a 403, 404 or 401 falls through to a generic 500.
//! Malformed bodies and query strings are rejected by axum's extractors.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chord_core::catalog::{CatalogError, TrackId};
use chord_core::storage::StorageError;
use serde_json::json;
use tracing::error;

/// Errors returned by API handlers, rendered as `{"message": ...}` JSON.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No metadata row for the requested track
    #[error("Track {id} not found")]
    TrackNotFound {
        /// Identifier as supplied by the client
        id: String,
    },

    /// Metadata row exists but its backing file is gone
    #[error("Audio file for track {id} not found")]
    AudioFileMissing {
        /// Track whose file is missing
        id: TrackId,
    },

    /// Principal may not perform `action` on the track
    #[error("Not permitted to {action} track")]
    Forbidden {
        /// Verb describing the refused operation
        action: &'static str,
    },

    /// Route requires a principal and none was supplied
    #[error("Authentication required")]
    Unauthorized,

    /// Unexpected server-side failure; `detail` is logged, never sent
    #[error("{message}: {detail}")]
    Internal {
        /// Generic message returned to the client
        message: &'static str,
        /// Diagnostic detail for the server log
        detail: String,
    },
}

impl ApiError {
    /// Wraps an unexpected failure with a client-safe message.
    pub fn internal(message: &'static str, detail: impl std::fmt::Display) -> Self {
        ApiError::Internal {
            message,
            detail: detail.to_string(),
        }
    }

    /// Status code this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::TrackNotFound { .. } | ApiError::AudioFileMissing { .. } => {
                StatusCode::NOT_FOUND
            }
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn client_message(&self) -> String {
        match self {
            ApiError::TrackNotFound { .. } => "Track not found".to_string(),
            ApiError::AudioFileMissing { .. } => "Audio file not found".to_string(),
            ApiError::Forbidden { action } => {
                format!("You do not have permission to {action} this track")
            }
            ApiError::Unauthorized => "Authentication required".to_string(),
            ApiError::Internal { message, .. } => (*message).to_string(),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::internal("Track database unavailable", err)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::internal("Media storage unavailable", err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal { message, detail } = &self {
            error!("{}: {}", message, detail);
        }

        let status = self.status();
        (status, Json(json!({ "message": self.client_message() }))).into_response()
    }
}
