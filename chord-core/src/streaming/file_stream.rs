//! Lazy chunked reads of backing media files.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::Stream;
use futures::stream;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, warn};

use super::{ByteRange, StreamingError};

/// Boxed stream of file chunks suitable for an HTTP response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// An opened backing file, sized at open time.
#[derive(Debug)]
pub struct MediaFile {
    file: File,
    path: PathBuf,
    size: u64,
}

impl MediaFile {
    /// Opens `path` read-only and records its size.
    ///
    /// # Errors
    ///
    /// - `StreamingError::FileMissing` - If nothing exists at `path`
    /// - `StreamingError::NotAFile` - If `path` is a directory or other non-regular file
    /// - `StreamingError::Io` - If the file exists but cannot be opened or inspected
    pub async fn open(path: &Path) -> Result<Self, StreamingError> {
        let file = match File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StreamingError::FileMissing {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(StreamingError::Io(e)),
        };

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(StreamingError::NotAFile {
                path: path.to_path_buf(),
            });
        }

        Ok(Self {
            file,
            path: path.to_path_buf(),
            size: metadata.len(),
        })
    }

    /// Size of the file in bytes when it was opened.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Location the file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Turns the file into a lazy stream over `range`, or the whole file if `None`.
    ///
    /// The stream yields at most `chunk_size` bytes per item and ends after
    /// exactly `range.length()` bytes. If the file ends early or a read fails,
    /// the stream yields an error so the HTTP connection is aborted instead of
    /// looking complete. Dropping the stream closes the file.
    ///
    /// # Errors
    ///
    /// - `StreamingError::Io` - If seeking to the range start failed
    pub async fn into_stream(
        mut self,
        range: Option<ByteRange>,
        chunk_size: usize,
    ) -> Result<ByteStream, StreamingError> {
        let (start, length) = match range {
            Some(range) => (range.start(), range.length()),
            None => (0, self.size),
        };

        if start > 0 {
            self.file.seek(SeekFrom::Start(start)).await?;
        }

        debug!(
            "Streaming {} bytes from offset {} of {}",
            length,
            start,
            self.path.display()
        );

        let reader = ChunkReader {
            file: self.file,
            path: self.path,
            remaining: length,
            chunk_size: chunk_size.max(1),
        };

        Ok(Box::pin(stream::unfold(reader, ChunkReader::next_chunk)))
    }
}

struct ChunkReader {
    file: File,
    path: PathBuf,
    remaining: u64,
    chunk_size: usize,
}

impl ChunkReader {
    async fn next_chunk(mut self) -> Option<(std::io::Result<Bytes>, Self)> {
        if self.remaining == 0 {
            return None;
        }

        let want = self.remaining.min(self.chunk_size as u64) as usize;
        let mut buffer = BytesMut::zeroed(want);

        match self.file.read(&mut buffer).await {
            Ok(0) => {
                warn!(
                    "{} ended with {} bytes still owed to the client",
                    self.path.display(),
                    self.remaining
                );
                let owed = self.remaining;
                self.remaining = 0;
                Some((
                    Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("media file truncated, {owed} bytes missing"),
                    )),
                    self,
                ))
            }
            Ok(n) => {
                buffer.truncate(n);
                self.remaining -= n as u64;
                Some((Ok(buffer.freeze()), self))
            }
            Err(e) => {
                warn!("Read from {} failed mid-stream: {}", self.path.display(), e);
                self.remaining = 0;
                Some((Err(e), self))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::storage::test_fixtures::sample_audio_bytes;

    async fn collect(stream: ByteStream) -> (Vec<Bytes>, Option<std::io::Error>) {
        let mut chunks = Vec::new();
        let mut stream = stream;
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => chunks.push(chunk),
                Err(e) => return (chunks, Some(e)),
            }
        }
        (chunks, None)
    }

    fn write_fixture(len: usize) -> (tempfile::TempDir, PathBuf, Vec<u8>) {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("track.mp3");
        let bytes = sample_audio_bytes(len);
        std::fs::write(&path, &bytes).unwrap();
        (temp_dir, path, bytes)
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = MediaFile::open(&temp_dir.path().join("nope.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, StreamingError::FileMissing { .. }));
    }

    #[tokio::test]
    async fn test_open_directory_is_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = MediaFile::open(temp_dir.path()).await.unwrap_err();
        assert!(matches!(err, StreamingError::NotAFile { .. }));
    }

    #[tokio::test]
    async fn test_full_file_streams_in_chunks() {
        let (_dir, path, bytes) = write_fixture(1000);
        let file = MediaFile::open(&path).await.unwrap();
        assert_eq!(file.size(), 1000);

        let (chunks, err) = collect(file.into_stream(None, 64).await.unwrap()).await;
        assert!(err.is_none());
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= 64));
        assert_eq!(chunks.concat(), bytes);
    }

    #[tokio::test]
    async fn test_range_stops_at_end_offset() {
        let (_dir, path, bytes) = write_fixture(1000);
        let file = MediaFile::open(&path).await.unwrap();
        let range = ByteRange::new(100, 299, 1000).unwrap();

        let (chunks, err) = collect(file.into_stream(Some(range), 64).await.unwrap()).await;
        assert!(err.is_none());
        assert_eq!(chunks.concat(), bytes[100..=299]);
    }

    #[tokio::test]
    async fn test_truncated_file_yields_error() {
        let (_dir, path, bytes) = write_fixture(1000);
        let file = MediaFile::open(&path).await.unwrap();

        // Shrink the file after its size was recorded.
        std::fs::write(&path, &bytes[..300]).unwrap();

        let (chunks, err) = collect(file.into_stream(None, 128).await.unwrap()).await;
        let err = err.expect("truncation must surface as an error");
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
        assert_eq!(chunks.concat(), bytes[..300]);
    }
}
