//! Chord Core - Track catalog, media storage and range streaming
//!
//! This crate provides the building blocks of the Chord music backend:
//! the persistent track catalog, the on-disk media store, HTTP range
//! parsing, lazy file streaming and play-count accounting.

pub mod catalog;
pub mod config;
pub mod plays;
pub mod storage;
pub mod streaming;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use catalog::{CatalogError, SqliteCatalog, Track, TrackCatalog, TrackId};
pub use config::ChordConfig;
pub use plays::PlayCounter;
pub use storage::{MediaStore, StorageError};
pub use streaming::{ByteRange, RangeOutcome, StreamingError};

/// Core errors that can bubble up from any Chord subsystem.
///
/// High-level error types representing failures in core functionality.
#[derive(Debug, thiserror::Error)]
pub enum ChordError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Streaming error: {0}")]
    Streaming(#[from] StreamingError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChordError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            ChordError::Catalog(CatalogError::Database(_)) => {
                "Could not reach the track database".to_string()
            }
            ChordError::Catalog(_) => "Track catalog error occurred".to_string(),
            ChordError::Storage(StorageError::InvalidPath { path }) => {
                format!("Invalid media path: {path}")
            }
            ChordError::Storage(_) => "Media storage error occurred".to_string(),
            ChordError::Streaming(_) => "Streaming error occurred".to_string(),
            ChordError::Configuration { reason } => format!("Configuration error: {reason}"),
            ChordError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ChordError::Configuration { .. } | ChordError::Storage(StorageError::InvalidPath { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, ChordError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_are_classified() {
        let invalid = ChordError::Storage(StorageError::InvalidPath {
            path: "../etc/passwd".to_string(),
        });
        assert!(invalid.is_user_error());
        assert_eq!(invalid.user_message(), "Invalid media path: ../etc/passwd");

        let io = ChordError::Io(std::io::Error::other("disk on fire"));
        assert!(!io.is_user_error());
        assert_eq!(io.user_message(), "File system error occurred");
    }
}
