use super::schema::Database;
use super::types::{Feed, FeedMetadata, FeedRef, StorageError};

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Insert a feed, or refresh the metadata of the feed with this URL.
    ///
    /// Returns the feed id, which is stable across repeated calls for the
    /// same URL.
    pub async fn create_feed(&self, url: &str, meta: &FeedMetadata) -> Result<i64, StorageError> {
        let now = chrono::Utc::now().timestamp();
        let name = if meta.name.trim().is_empty() {
            url
        } else {
            meta.name.trim()
        };

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO feeds (url, name, link, description, language, image_url, image_title, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                name = excluded.name,
                link = excluded.link,
                description = excluded.description,
                language = excluded.language,
                image_url = excluded.image_url,
                image_title = excluded.image_title
            RETURNING id
        "#,
        )
        .bind(url)
        .bind(name)
        .bind(&meta.link)
        .bind(&meta.description)
        .bind(&meta.language)
        .bind(&meta.image_url)
        .bind(&meta.image_title)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::from_sqlx)?;

        Ok(id)
    }

    /// Feeds to refresh next: never-fetched feeds first, then the least
    /// recently fetched. At most `limit` rows.
    pub async fn get_feeds_due_for_fetch(&self, limit: usize) -> Result<Vec<FeedRef>, StorageError> {
        let limit: i64 = limit.try_into().unwrap_or(i64::MAX);
        let feeds = sqlx::query_as::<_, FeedRef>(
            r#"
            SELECT id, url
            FROM feeds
            ORDER BY last_fetched_at IS NOT NULL, last_fetched_at ASC, id ASC
            LIMIT ?
        "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from_sqlx)?;

        Ok(feeds)
    }

    /// Stamp the feed as fetched now.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FeedNotFound`] if no feed has this id.
    pub async fn mark_feed_fetched(&self, feed_id: i64) -> Result<(), StorageError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query("UPDATE feeds SET last_fetched_at = ? WHERE id = ?")
            .bind(now)
            .bind(feed_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::FeedNotFound(feed_id));
        }
        Ok(())
    }

    pub async fn get_feed(&self, feed_id: i64) -> Result<Option<Feed>, StorageError> {
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, url, name, link, description, language, image_url, image_title,
                   created_at, last_fetched_at
            FROM feeds
            WHERE id = ?
        "#,
        )
        .bind(feed_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from_sqlx)?;

        Ok(feed)
    }

    /// All feeds, ordered by name
    pub async fn list_feeds(&self) -> Result<Vec<Feed>, StorageError> {
        let feeds = sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, url, name, link, description, language, image_url, image_title,
                   created_at, last_fetched_at
            FROM feeds
            ORDER BY name, id
        "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from_sqlx)?;

        Ok(feeds)
    }
}
