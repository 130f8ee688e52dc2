use async_trait::async_trait;

use super::schema::Database;
use super::types::{FeedMetadata, FeedRef, NewPost, Post, StorageError};

/// What the ingestion pipeline needs from persistent storage.
///
/// Implementations own the due-feed selection policy and must enforce the
/// `(feed_id, url)` uniqueness of posts themselves, reporting a repeated pair
/// as [`StorageError::Duplicate`].
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Up to `limit` feeds that should be fetched next.
    async fn feeds_due_for_fetch(&self, limit: usize) -> Result<Vec<FeedRef>, StorageError>;

    /// Record a successful fetch of the feed.
    async fn mark_feed_fetched(&self, feed_id: i64) -> Result<(), StorageError>;

    /// Persist a post unless one with the same `(feed_id, url)` exists.
    async fn create_post(&self, post: &NewPost) -> Result<Post, StorageError>;

    /// Insert or refresh a feed by URL, returning its id.
    async fn create_feed(&self, url: &str, meta: &FeedMetadata) -> Result<i64, StorageError>;
}

#[async_trait]
impl FeedStore for Database {
    async fn feeds_due_for_fetch(&self, limit: usize) -> Result<Vec<FeedRef>, StorageError> {
        self.get_feeds_due_for_fetch(limit).await
    }

    async fn mark_feed_fetched(&self, feed_id: i64) -> Result<(), StorageError> {
        Database::mark_feed_fetched(self, feed_id).await
    }

    async fn create_post(&self, post: &NewPost) -> Result<Post, StorageError> {
        Database::create_post(self, post).await
    }

    async fn create_feed(&self, url: &str, meta: &FeedMetadata) -> Result<i64, StorageError> {
        Database::create_feed(self, url, meta).await
    }
}
