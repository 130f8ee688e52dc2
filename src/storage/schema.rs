use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::StorageError;

// ============================================================================
// Database
// ============================================================================

/// SQLite-backed feed and post store.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations
    ///
    /// `":memory:"` opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InstanceLocked` if another process holds the
    /// database lock, `StorageError::Migration` if the schema could not be
    /// created, and `StorageError::Database` for other failures.
    pub async fn open(path: &str) -> Result<Self, StorageError> {
        let in_memory = path == ":memory:";
        let url = format!("sqlite:{}?mode=rwc", path);

        // busy_timeout=5000: concurrent ingestion workers wait for the single
        // SQLite writer instead of failing with SQLITE_BUSY.
        let mut options = SqliteConnectOptions::from_str(&url)
            .map_err(StorageError::from_sqlx)?
            .foreign_keys(true)
            .pragma("busy_timeout", "5000");
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // A shared-cache in-memory database reports table locks instead of
        // waiting on them, so it gets exactly one connection that never expires.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(StorageError::from_sqlx)?;

        let db = Self { pool };
        db.migrate().await.map_err(|e| match StorageError::from_sqlx(e) {
            StorageError::InstanceLocked => StorageError::InstanceLocked,
            other => StorageError::Migration(other.to_string()),
        })?;
        Ok(db)
    }

    /// Run database migrations atomically within a transaction.
    ///
    /// All statements use `IF NOT EXISTS`, so re-running on an existing
    /// database is a no-op.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feeds (
                id INTEGER PRIMARY KEY,
                url TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                link TEXT,
                description TEXT,
                language TEXT,
                image_url TEXT,
                image_title TEXT,
                created_at INTEGER NOT NULL,
                last_fetched_at INTEGER
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // UNIQUE(feed_id, url) is the dedup key for ingestion.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY,
                feed_id INTEGER NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                author TEXT,
                description TEXT,
                content TEXT,
                published_at INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                UNIQUE(feed_id, url)
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Due-feed selection scans by last fetch time
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_feeds_last_fetched ON feeds(last_fetched_at)",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_posts_feed_published ON posts(feed_id, published_at DESC)",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
