//! Storage layer for backing media files.
//!
//! Track rows store file paths relative to a single media root. This module
//! resolves those paths safely and removes files when tracks are deleted.

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;

use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

/// On-disk home of every backing audio file.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    /// Creates a store rooted at `root`. The directory need not exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a stored relative path to its location under the root.
    ///
    /// A single leading `/` is tolerated since uploaded paths were historically
    /// recorded that way. Any other absolute path or a `..` component is rejected.
    ///
    /// # Errors
    ///
    /// - `StorageError::InvalidPath` - If the path would escape the media root
    pub fn resolve(&self, stored_path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(stored_path.trim_start_matches('/'));

        let mut resolved = self.root.clone();
        let mut has_file_component = false;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    has_file_component = true;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(StorageError::InvalidPath {
                        path: stored_path.to_string(),
                    });
                }
            }
        }

        if !has_file_component {
            return Err(StorageError::InvalidPath {
                path: stored_path.to_string(),
            });
        }

        Ok(resolved)
    }

    /// Converts an absolute or root-relative file location into the relative
    /// form stored on track rows.
    ///
    /// # Errors
    ///
    /// - `StorageError::InvalidPath` - If `path` lies outside the media root
    pub fn relative_path(&self, path: &Path) -> Result<String, StorageError> {
        let candidate = if path.is_absolute() {
            path.strip_prefix(&self.root)
                .map_err(|_| StorageError::InvalidPath {
                    path: path.display().to_string(),
                })?
                .to_path_buf()
        } else {
            path.to_path_buf()
        };

        let relative = candidate.to_string_lossy().replace('\\', "/");
        // Round-trip through resolve to reject `..` and empty paths.
        self.resolve(&relative)?;
        Ok(relative)
    }

    /// Deletes the backing file of a removed track.
    ///
    /// Returns `true` if a file was removed. A file that is already gone is
    /// not an error.
    ///
    /// # Errors
    ///
    /// - `StorageError::InvalidPath` - If the stored path escapes the media root
    /// - `StorageError::Io` - If removal failed for any other reason
    pub async fn remove(&self, stored_path: &str) -> Result<bool, StorageError> {
        let path = self.resolve(stored_path)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed media file {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Media file {} was already missing", path.display());
                Ok(false)
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

/// Errors that occur while locating or removing media files.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Stored path is absolute, empty or escapes the media root
    #[error("Invalid media path: {path}")]
    InvalidPath {
        /// The offending stored path
        path: String,
    },

    /// Standard I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_paths() {
        let store = MediaStore::new("/srv/uploads");

        assert_eq!(
            store.resolve("user-1/song.mp3").unwrap(),
            PathBuf::from("/srv/uploads/user-1/song.mp3")
        );
        assert_eq!(
            store.resolve("/user-1/./song.mp3").unwrap(),
            PathBuf::from("/srv/uploads/user-1/song.mp3")
        );
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let store = MediaStore::new("/srv/uploads");

        for bad in ["../secret.mp3", "user-1/../../etc/passwd", "", "/", "./"] {
            assert!(
                matches!(store.resolve(bad), Err(StorageError::InvalidPath { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_relative_path_strips_root() {
        let store = MediaStore::new("/srv/uploads");

        assert_eq!(
            store
                .relative_path(Path::new("/srv/uploads/user-2/a.ogg"))
                .unwrap(),
            "user-2/a.ogg"
        );
        assert_eq!(
            store.relative_path(Path::new("user-2/a.ogg")).unwrap(),
            "user-2/a.ogg"
        );
        assert!(store.relative_path(Path::new("/elsewhere/a.ogg")).is_err());
    }

    #[tokio::test]
    async fn test_remove_tolerates_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(temp_dir.path());
        std::fs::write(temp_dir.path().join("a.mp3"), b"abc").unwrap();

        assert!(store.remove("a.mp3").await.unwrap());
        assert!(!temp_dir.path().join("a.mp3").exists());
        assert!(!store.remove("a.mp3").await.unwrap());
    }
}
