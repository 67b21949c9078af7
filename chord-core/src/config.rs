//! Centralized configuration for Chord.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::path::PathBuf;

/// Central configuration for all Chord components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct ChordConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Externally visible base URL, used when building stream URLs
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3002,
            public_url: "http://localhost:3002".to_string(),
        }
    }
}

impl ServerConfig {
    /// Socket address string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Media file and database storage configuration.
///
/// Controls where backing audio files live, which database holds track
/// metadata, and how large each streamed chunk is.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory that track file paths are resolved against
    pub media_root: PathBuf,
    /// SQLite connection URL for the track catalog
    pub database_url: String,
    /// Size of each chunk read from disk while streaming
    pub stream_chunk_size: usize,
    /// Maximum pooled database connections
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("uploads"),
            database_url: "sqlite://data/chord.sqlite".to_string(),
            stream_chunk_size: 65536, // 64 KiB
            max_connections: 10,
        }
    }
}

/// Identity headers set by the upstream authentication gateway.
///
/// Token verification happens before requests reach Chord; the gateway
/// forwards the verified principal in these headers.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Header carrying the numeric principal id
    pub principal_header: String,
    /// Header carrying the principal role (`admin` or `user`)
    pub role_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            principal_header: "x-chord-user".to_string(),
            role_header: "x-chord-role".to_string(),
        }
    }
}

impl ChordConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("CHORD_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = std::env::var("CHORD_PORT")
            && let Ok(port) = port.parse::<u16>()
        {
            config.server.port = port;
        }

        if let Ok(public_url) = std::env::var("CHORD_PUBLIC_URL") {
            config.server.public_url = public_url;
        }

        if let Ok(media_root) = std::env::var("CHORD_MEDIA_ROOT") {
            config.storage.media_root = PathBuf::from(media_root);
        }

        if let Ok(database_url) = std::env::var("CHORD_DATABASE_URL") {
            config.storage.database_url = database_url;
        }

        if let Ok(chunk_size) = std::env::var("CHORD_STREAM_CHUNK_SIZE")
            && let Ok(bytes) = chunk_size.parse::<usize>()
            && bytes > 0
        {
            config.storage.stream_chunk_size = bytes;
        }

        config
    }

    /// Creates a configuration optimized for testing.
    ///
    /// Small stream chunks force multi-chunk bodies even for tiny fixtures.
    pub fn for_testing(media_root: PathBuf, database_url: String) -> Self {
        Self {
            storage: StorageConfig {
                media_root,
                database_url,
                stream_chunk_size: 64,
                max_connections: 4,
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = ChordConfig::default();

        assert_eq!(config.server.port, 3002);
        assert_eq!(config.server.bind_address(), "127.0.0.1:3002");
        assert_eq!(config.storage.stream_chunk_size, 65536);
        assert_eq!(config.storage.media_root, PathBuf::from("uploads"));
        assert_eq!(config.auth.principal_header, "x-chord-user");
    }

    #[test]
    fn test_testing_preset() {
        let config =
            ChordConfig::for_testing(PathBuf::from("/tmp/media"), "sqlite::memory:".to_string());
        assert_eq!(config.storage.stream_chunk_size, 64);
        assert_eq!(config.storage.media_root, PathBuf::from("/tmp/media"));
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("CHORD_PORT", "4100");
            std::env::set_var("CHORD_MEDIA_ROOT", "/srv/chord/uploads");
            std::env::set_var("CHORD_STREAM_CHUNK_SIZE", "0");
        }

        let config = ChordConfig::from_env();

        assert_eq!(config.server.port, 4100);
        assert_eq!(
            config.storage.media_root,
            PathBuf::from("/srv/chord/uploads")
        );
        // zero-sized chunks are ignored
        assert_eq!(config.storage.stream_chunk_size, 65536);

        // Cleanup
        unsafe {
            std::env::remove_var("CHORD_PORT");
            std::env::remove_var("CHORD_MEDIA_ROOT");
            std::env::remove_var("CHORD_STREAM_CHUNK_SIZE");
        }
    }
}
