//! Range-aware streaming of backing media files
//!
//! Parsing of `Range` headers lives in [`range`]; lazily reading the selected
//! bytes from disk lives in [`file_stream`]. Building the HTTP response from
//! the two is left to the web layer.

pub mod file_stream;
pub mod range;

use std::path::PathBuf;

pub use file_stream::{ByteStream, MediaFile};
pub use range::{ByteRange, RangeOutcome, parse_range_header};

/// Errors raised while opening or reading a backing media file.
#[derive(Debug, thiserror::Error)]
pub enum StreamingError {
    /// Track metadata exists but the backing file does not
    #[error("Media file missing: {path}")]
    FileMissing {
        /// Resolved location that was expected to hold the file
        path: PathBuf,
    },

    /// Something other than a regular file sits at the backing path
    #[error("Not a regular file: {path}")]
    NotAFile {
        /// Resolved location of the non-file entry
        path: PathBuf,
    },

    /// Underlying I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamingError {
    /// Whether the backing bytes are absent, as opposed to unreadable.
    pub fn is_missing_file(&self) -> bool {
        matches!(
            self,
            StreamingError::FileMissing { .. } | StreamingError::NotAFile { .. }
        )
    }
}
