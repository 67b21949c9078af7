//! Test fixtures for storage testing.
//!
//! Provides a throwaway media root and catalog database so tests across the
//! workspace exercise real files and a real SQLite schema.

use std::path::{Path, PathBuf};

use crate::catalog::SqliteCatalog;

/// Temporary media root plus catalog database, removed on drop.
pub struct TestLibrary {
    _temp_dir: tempfile::TempDir,
    media_root: PathBuf,
    database_path: PathBuf,
    catalog: SqliteCatalog,
}

impl TestLibrary {
    /// Directory that track file paths resolve against.
    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    /// Location of the SQLite database file.
    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    /// `sqlite://` URL of the catalog database.
    pub fn database_url(&self) -> String {
        format!("sqlite://{}", self.database_path.display())
    }

    /// Catalog connected to the fixture database.
    pub fn catalog(&self) -> &SqliteCatalog {
        &self.catalog
    }

    /// Writes `bytes` to `relative_path` under the media root.
    ///
    /// # Panics
    ///
    /// Panics if the file or its parent directory cannot be created.
    pub fn write_media_file(&self, relative_path: &str, bytes: &[u8]) -> PathBuf {
        let path = self.media_root.join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, bytes).unwrap();
        path
    }
}

/// Creates a media root and an initialized catalog in a fresh temp directory.
///
/// # Panics
///
/// Panics if temporary directory creation fails or the database cannot be opened.
/// This is acceptable in test fixtures where failures indicate environment issues.
pub async fn create_test_library() -> TestLibrary {
    let temp_dir = tempfile::tempdir().unwrap();
    let media_root = temp_dir.path().join("uploads");
    let database_path = temp_dir.path().join("data").join("chord.sqlite");

    std::fs::create_dir_all(&media_root).unwrap();

    let catalog = SqliteCatalog::open_file(&database_path, 8).await.unwrap();

    TestLibrary {
        _temp_dir: temp_dir,
        media_root,
        database_path,
        catalog,
    }
}

/// Deterministic pseudo-audio payload of `len` bytes.
///
/// The pattern does not repeat every 256 bytes, so an off-by-one range
/// offset produces visibly different content.
pub fn sample_audio_bytes(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| ((i * 31 + i / 251) % 256) as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_library_layout() {
        let library = create_test_library().await;

        assert!(library.media_root().is_dir());
        assert!(library.database_path().exists());

        let path = library.write_media_file("user-1/a.mp3", b"abc");
        assert!(path.starts_with(library.media_root()));
        assert_eq!(std::fs::read(path).unwrap(), b"abc");
    }

    #[test]
    fn test_sample_bytes_are_not_byte_periodic() {
        let bytes = sample_audio_bytes(1024);
        assert_eq!(bytes.len(), 1024);
        assert_ne!(bytes[0..256], bytes[256..512]);
    }
}
