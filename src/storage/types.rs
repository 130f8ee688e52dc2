use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Storage errors.
///
/// [`StorageError::Duplicate`] is an expected outcome during ingestion: the
/// `(feed_id, url)` pair is already stored.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A post with the same `(feed_id, url)` already exists
    #[error("Post already exists for feed {feed_id}: {url}")]
    Duplicate { feed_id: i64, url: String },

    /// No feed row with this id
    #[error("Feed {0} not found")]
    FeedNotFound(i64),

    /// Another process holds a lock on the database
    #[error("Database is locked by another process")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    /// Classify a sqlx error, detecting lock contention.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5), SQLITE_LOCKED (6), SQLITE_CANTOPEN (14)
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return StorageError::InstanceLocked;
        }

        StorageError::Database(err)
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, StorageError::Duplicate { .. })
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// The part of a feed row the ingestion pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FeedRef {
    pub id: i64,
    pub url: String,
}

/// Feed row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Feed {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub link: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub image_url: Option<String>,
    pub image_title: Option<String>,
    pub created_at: i64,
    /// `None` until the first successful fetch
    pub last_fetched_at: Option<i64>,
}

/// Descriptive fields recorded when a feed is subscribed.
#[derive(Debug, Clone, Default)]
pub struct FeedMetadata {
    pub name: String,
    pub link: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub image_url: Option<String>,
    pub image_title: Option<String>,
}

/// A post to insert, keyed by `(feed_id, url)`.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub feed_id: i64,
    pub title: String,
    pub url: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    /// Unix seconds, `0` when the publish date is unknown
    pub published_at: i64,
}

/// Post row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    pub url: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub published_at: i64,
    pub created_at: i64,
}
