//! Play-count accounting detached from the response path.
//!
//! A stream counts as a play once the responder commits to sending content.
//! The increment runs as its own task; its outcome only ever reaches the log.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::catalog::{TrackCatalog, TrackId};

/// Dispatches fire-and-forget play-count increments.
#[derive(Clone)]
pub struct PlayCounter {
    catalog: Arc<dyn TrackCatalog>,
}

impl PlayCounter {
    /// Creates a counter writing to `catalog`.
    pub fn new(catalog: Arc<dyn TrackCatalog>) -> Self {
        Self { catalog }
    }

    /// Spawns one atomic increment for `track_id` and returns immediately.
    ///
    /// Failures are logged and swallowed; nothing is retried. The handle is
    /// only useful to tests that need to wait for the write.
    pub fn record_play(&self, track_id: TrackId) -> JoinHandle<()> {
        let catalog = Arc::clone(&self.catalog);
        tokio::spawn(async move {
            match catalog.increment_play_count(track_id).await {
                Ok(Some(plays)) => debug!("Track {} play count now {}", track_id, plays),
                Ok(None) => warn!(
                    "Track {} disappeared before its play could be counted",
                    track_id
                ),
                Err(e) => error!("Failed to increment play count for {}: {}", track_id, e),
            }
        })
    }
}

impl std::fmt::Debug for PlayCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayCounter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::catalog::{
        CatalogError, NewTrack, PrincipalId, Track, TrackQuery, TrackUpdate,
    };
    use crate::storage::test_fixtures::create_test_library;

    /// Catalog whose every operation fails, counting increment attempts.
    #[derive(Default)]
    struct BrokenCatalog {
        increments: AtomicUsize,
    }

    fn broken() -> CatalogError {
        CatalogError::CorruptRecord {
            column: "plays",
            reason: "storage offline".to_string(),
        }
    }

    #[async_trait]
    impl TrackCatalog for BrokenCatalog {
        async fn insert_track(&self, _new_track: NewTrack) -> Result<Track, CatalogError> {
            Err(broken())
        }

        async fn find_track(&self, _id: TrackId) -> Result<Option<Track>, CatalogError> {
            Err(broken())
        }

        async fn list_public_tracks(
            &self,
            _query: &TrackQuery,
        ) -> Result<Vec<Track>, CatalogError> {
            Err(broken())
        }

        async fn tracks_by_owner(&self, _owner: PrincipalId) -> Result<Vec<Track>, CatalogError> {
            Err(broken())
        }

        async fn update_track(
            &self,
            _id: TrackId,
            _update: TrackUpdate,
        ) -> Result<Option<Track>, CatalogError> {
            Err(broken())
        }

        async fn delete_track(&self, _id: TrackId) -> Result<Option<Track>, CatalogError> {
            Err(broken())
        }

        async fn increment_play_count(&self, _id: TrackId) -> Result<Option<i64>, CatalogError> {
            self.increments.fetch_add(1, Ordering::SeqCst);
            Err(broken())
        }

        async fn count_tracks(&self) -> Result<i64, CatalogError> {
            Err(broken())
        }
    }

    #[tokio::test]
    async fn test_record_play_increments_once() {
        let library = create_test_library().await;
        let catalog: Arc<dyn TrackCatalog> = Arc::new(library.catalog().clone());
        let track = catalog
            .insert_track(NewTrack::new("one", "one.mp3"))
            .await
            .unwrap();

        let counter = PlayCounter::new(Arc::clone(&catalog));
        counter.record_play(track.id).await.unwrap();

        let stored = catalog.find_track(track.id).await.unwrap().unwrap();
        assert_eq!(stored.plays, 1);
    }

    #[tokio::test]
    async fn test_failed_increment_is_swallowed_without_retry() {
        let catalog = Arc::new(BrokenCatalog::default());
        let counter = PlayCounter::new(catalog.clone());

        // The task completes normally even though the write failed.
        counter.record_play(TrackId::new_random()).await.unwrap();
        assert_eq!(catalog.increments.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_track_is_not_an_error() {
        let library = create_test_library().await;
        let counter = PlayCounter::new(Arc::new(library.catalog().clone()));
        counter.record_play(TrackId::new_random()).await.unwrap();
    }
}
