//! SQLite-backed track catalog.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use super::{
    CatalogError, NewTrack, PrincipalId, Track, TrackCatalog, TrackId, TrackQuery, TrackUpdate,
};

const TRACK_COLUMNS: &str = "id, title, file_path, cover_image, genre, duration_secs, \
     is_public, plays, owner_id, media_type, created_at, updated_at";

const CREATE_TRACKS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS tracks (
        id TEXT PRIMARY KEY NOT NULL,
        title TEXT NOT NULL,
        file_path TEXT NOT NULL,
        cover_image TEXT,
        genre TEXT,
        duration_secs INTEGER NOT NULL DEFAULT 0,
        is_public BOOLEAN NOT NULL DEFAULT 1,
        plays INTEGER NOT NULL DEFAULT 0,
        owner_id INTEGER,
        media_type TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
"#;

const CREATE_OWNER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS tracks_owner_idx ON tracks (owner_id)";

/// Track catalog stored in a SQLite database through a connection pool.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    /// Opens (creating if necessary) the database at `database_url` and
    /// ensures the schema exists.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Database` - If the URL is invalid or the database cannot be opened
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, CatalogError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        if let Some(parent) = options.get_filename().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let catalog = Self { pool };
        catalog.ensure_schema().await?;

        info!("Track catalog ready at {}", database_url);
        Ok(catalog)
    }

    /// Opens the database file at `path`; see [`SqliteCatalog::connect`].
    ///
    /// # Errors
    ///
    /// - `CatalogError::Database` - If the database cannot be opened
    pub async fn open_file(path: &Path, max_connections: u32) -> Result<Self, CatalogError> {
        Self::connect(&format!("sqlite://{}", path.display()), max_connections).await
    }

    /// Creates the `tracks` table and its indexes if they are missing.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Database` - If a DDL statement failed
    pub async fn ensure_schema(&self) -> Result<(), CatalogError> {
        sqlx::query(CREATE_TRACKS_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_OWNER_INDEX).execute(&self.pool).await?;
        Ok(())
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn decode_track(row: &SqliteRow) -> Result<Track, CatalogError> {
    let id: String = row.try_get("id")?;
    let id = id
        .parse::<TrackId>()
        .map_err(|e| CatalogError::CorruptRecord {
            column: "id",
            reason: e.to_string(),
        })?;

    Ok(Track {
        id,
        title: row.try_get("title")?,
        file_path: row.try_get("file_path")?,
        cover_image: row.try_get("cover_image")?,
        genre: row.try_get("genre")?,
        duration_secs: row.try_get("duration_secs")?,
        is_public: row.try_get("is_public")?,
        plays: row.try_get("plays")?,
        owner_id: row.try_get("owner_id")?,
        media_type: row.try_get("media_type")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn decode_tracks(rows: &[SqliteRow]) -> Result<Vec<Track>, CatalogError> {
    rows.iter().map(decode_track).collect()
}

#[async_trait]
impl TrackCatalog for SqliteCatalog {
    async fn insert_track(&self, new_track: NewTrack) -> Result<Track, CatalogError> {
        let id = TrackId::new_random();
        let now = Utc::now();

        let sql = format!(
            "INSERT INTO tracks ({TRACK_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?) RETURNING {TRACK_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .bind(&new_track.title)
            .bind(&new_track.file_path)
            .bind(&new_track.cover_image)
            .bind(&new_track.genre)
            .bind(new_track.duration_secs)
            .bind(new_track.is_public)
            .bind(new_track.owner_id)
            .bind(&new_track.media_type)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        debug!("Inserted track {} ({})", id, new_track.title);
        decode_track(&row)
    }

    async fn find_track(&self, id: TrackId) -> Result<Option<Track>, CatalogError> {
        let sql = format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode_track).transpose()
    }

    async fn list_public_tracks(&self, query: &TrackQuery) -> Result<Vec<Track>, CatalogError> {
        let sql = format!(
            "SELECT {TRACK_COLUMNS} FROM tracks \
             WHERE is_public = 1 \
               AND (?1 IS NULL OR genre LIKE '%' || ?1 || '%') \
               AND (?2 IS NULL OR title LIKE '%' || ?2 || '%' OR genre LIKE '%' || ?2 || '%') \
             ORDER BY created_at DESC, rowid DESC \
             LIMIT ?3 OFFSET ?4"
        );
        let rows = sqlx::query(&sql)
            .bind(query.genre.as_deref().filter(|g| !g.is_empty()))
            .bind(query.query.as_deref().filter(|q| !q.is_empty()))
            .bind(i64::from(query.limit))
            .bind(i64::from(query.offset))
            .fetch_all(&self.pool)
            .await?;

        decode_tracks(&rows)
    }

    async fn tracks_by_owner(&self, owner: PrincipalId) -> Result<Vec<Track>, CatalogError> {
        let sql = format!(
            "SELECT {TRACK_COLUMNS} FROM tracks WHERE owner_id = ? \
             ORDER BY created_at DESC, rowid DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;

        decode_tracks(&rows)
    }

    async fn update_track(
        &self,
        id: TrackId,
        update: TrackUpdate,
    ) -> Result<Option<Track>, CatalogError> {
        let sql = format!(
            "UPDATE tracks SET \
                title = COALESCE(?, title), \
                genre = COALESCE(?, genre), \
                is_public = COALESCE(?, is_public), \
                updated_at = ? \
             WHERE id = ? RETURNING {TRACK_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(update.title.filter(|t| !t.is_empty()))
            .bind(update.genre)
            .bind(update.is_public)
            .bind(Utc::now())
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode_track).transpose()
    }

    async fn delete_track(&self, id: TrackId) -> Result<Option<Track>, CatalogError> {
        let sql = format!("DELETE FROM tracks WHERE id = ? RETURNING {TRACK_COLUMNS}");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode_track).transpose()
    }

    async fn increment_play_count(&self, id: TrackId) -> Result<Option<i64>, CatalogError> {
        // Single statement: concurrent plays serialize inside SQLite.
        let plays = sqlx::query_scalar::<_, i64>(
            "UPDATE tracks SET plays = plays + 1 WHERE id = ? RETURNING plays",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(plays)
    }

    async fn count_tracks(&self) -> Result<i64, CatalogError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tracks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
