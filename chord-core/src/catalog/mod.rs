//! Track catalog - persistent metadata for streamable audio.
//!
//! Defines the storage interface for track rows with a SQLite implementation.
//! The catalog never touches backing files; see [`crate::storage`] for those.

pub mod sqlite;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use sqlite::SqliteCatalog;

/// Fallback media type for tracks without a recorded or guessable type.
pub const DEFAULT_MEDIA_TYPE: &str = "audio/mpeg";

/// Unique identifier for a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(Uuid);

impl TrackId {
    /// Generates a fresh random identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for TrackId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for TrackId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an authenticated principal (a user account).
pub type PrincipalId = i64;

/// A streamable audio asset and its metadata row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    /// Backing file location relative to the media root; never serialized
    #[serde(skip)]
    pub file_path: String,
    pub cover_image: Option<String>,
    pub genre: Option<String>,
    /// Duration in whole seconds
    pub duration_secs: i64,
    pub is_public: bool,
    pub plays: i64,
    pub owner_id: Option<PrincipalId>,
    /// Explicit media type, if one was recorded at upload
    pub media_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Track {
    /// Whether `principal` may read this track.
    ///
    /// Public tracks are readable by anyone, private tracks only by their owner.
    pub fn is_visible_to(&self, principal: Option<PrincipalId>) -> bool {
        self.is_public || self.is_owned_by(principal)
    }

    /// Whether `principal` uploaded this track.
    pub fn is_owned_by(&self, principal: Option<PrincipalId>) -> bool {
        matches!((self.owner_id, principal), (Some(owner), Some(p)) if owner == p)
    }

    /// Media type for the `Content-Type` header.
    ///
    /// Uses the recorded type, then a guess from the file extension, then
    /// [`DEFAULT_MEDIA_TYPE`].
    pub fn resolved_media_type(&self) -> String {
        if let Some(media_type) = self.media_type.as_deref()
            && !media_type.is_empty()
        {
            return media_type.to_string();
        }

        mime_guess::from_path(&self.file_path)
            .first()
            .filter(|mime| matches!(mime.type_().as_str(), "audio" | "video"))
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string())
    }
}

/// Fields for registering a new track.
#[derive(Debug, Clone)]
pub struct NewTrack {
    pub title: String,
    pub file_path: String,
    pub cover_image: Option<String>,
    pub genre: Option<String>,
    pub duration_secs: i64,
    pub is_public: bool,
    pub owner_id: Option<PrincipalId>,
    pub media_type: Option<String>,
}

impl NewTrack {
    /// Minimal public track with the given title and relative file path.
    pub fn new(title: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            file_path: file_path.into(),
            cover_image: None,
            genre: None,
            duration_secs: 0,
            is_public: true,
            owner_id: None,
            media_type: None,
        }
    }
}

/// Metadata changes accepted from the track owner. `None` leaves a field as is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackUpdate {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub is_public: Option<bool>,
}

/// Filters for listing public tracks.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackQuery {
    /// Substring match on genre
    pub genre: Option<String>,
    /// Substring match on title or genre
    pub query: Option<String>,
    #[serde(default = "TrackQuery::default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

impl TrackQuery {
    fn default_limit() -> u32 {
        20
    }
}

impl Default for TrackQuery {
    fn default() -> Self {
        Self {
            genre: None,
            query: None,
            limit: Self::default_limit(),
            offset: 0,
        }
    }
}

/// Storage operations for track metadata.
///
/// Implementations must make [`TrackCatalog::increment_play_count`] a single
/// atomic update so concurrent plays are never lost.
#[async_trait]
pub trait TrackCatalog: Send + Sync {
    /// Inserts a new track and returns the stored row.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Database` - If the insert failed
    async fn insert_track(&self, new_track: NewTrack) -> Result<Track, CatalogError>;

    /// Looks up a track by id.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Database` - If the query failed
    /// - `CatalogError::CorruptRecord` - If the stored row cannot be decoded
    async fn find_track(&self, id: TrackId) -> Result<Option<Track>, CatalogError>;

    /// Lists public tracks matching `query`, newest first.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Database` - If the query failed
    async fn list_public_tracks(&self, query: &TrackQuery) -> Result<Vec<Track>, CatalogError>;

    /// Lists every track uploaded by `owner`, newest first.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Database` - If the query failed
    async fn tracks_by_owner(&self, owner: PrincipalId) -> Result<Vec<Track>, CatalogError>;

    /// Applies `update` and returns the updated row, or `None` if absent.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Database` - If the update failed
    async fn update_track(
        &self,
        id: TrackId,
        update: TrackUpdate,
    ) -> Result<Option<Track>, CatalogError>;

    /// Deletes a track row and returns it, or `None` if absent.
    ///
    /// Removing the backing file is the caller's job.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Database` - If the delete failed
    async fn delete_track(&self, id: TrackId) -> Result<Option<Track>, CatalogError>;

    /// Atomically adds one play and returns the new count, or `None` if the
    /// track no longer exists.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Database` - If the update failed
    async fn increment_play_count(&self, id: TrackId) -> Result<Option<i64>, CatalogError>;

    /// Total number of tracks, public or not.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Database` - If the query failed
    async fn count_tracks(&self) -> Result<i64, CatalogError>;
}

/// Errors that occur during catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Underlying database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row holds a value that cannot be decoded
    #[error("Corrupt value in column {column}: {reason}")]
    CorruptRecord {
        /// Column holding the bad value
        column: &'static str,
        /// Why decoding failed
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_track(owner: Option<PrincipalId>, is_public: bool) -> Track {
        Track {
            id: TrackId::new_random(),
            title: "Night Drive".to_string(),
            file_path: "user-1/night-drive.flac".to_string(),
            cover_image: None,
            genre: Some("synthwave".to_string()),
            duration_secs: 241,
            is_public,
            plays: 0,
            owner_id: owner,
            media_type: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_private_track_visibility() {
        let track = sample_track(Some(7), false);
        assert!(track.is_visible_to(Some(7)));
        assert!(!track.is_visible_to(Some(8)));
        assert!(!track.is_visible_to(None));
    }

    #[test]
    fn test_ownerless_private_track_is_hidden_from_everyone() {
        let track = sample_track(None, false);
        assert!(!track.is_visible_to(None));
        assert!(!track.is_visible_to(Some(1)));
    }

    #[test]
    fn test_public_track_visible_to_anonymous() {
        assert!(sample_track(Some(7), true).is_visible_to(None));
    }

    #[test]
    fn test_media_type_resolution() {
        let mut track = sample_track(None, true);
        assert_eq!(track.resolved_media_type(), "audio/flac");

        track.file_path = "user-1/upload.bin".to_string();
        assert_eq!(track.resolved_media_type(), DEFAULT_MEDIA_TYPE);

        track.media_type = Some("audio/ogg".to_string());
        assert_eq!(track.resolved_media_type(), "audio/ogg");
    }

    #[test]
    fn test_track_id_round_trips_through_text() {
        let id = TrackId::new_random();
        let parsed: TrackId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<TrackId>().is_err());
    }
}
