use super::schema::Database;
use super::types::{NewPost, Post, StorageError};

/// Maximum number of posts to return from any single query
const MAX_POSTS: i64 = 2000;

impl Database {
    // ========================================================================
    // Post Operations
    // ========================================================================

    /// Insert a post.
    ///
    /// Deduplication is left to the `UNIQUE(feed_id, url)` constraint: a
    /// second insert for the same pair fails with
    /// [`StorageError::Duplicate`] and leaves the stored row untouched.
    pub async fn create_post(&self, post: &NewPost) -> Result<Post, StorageError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (feed_id, title, url, author, description, content, published_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, feed_id, title, url, author, description, content, published_at, created_at
        "#,
        )
        .bind(post.feed_id)
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.author)
        .bind(&post.description)
        .bind(&post.content)
        .bind(post.published_at)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StorageError::Duplicate {
                    feed_id: post.feed_id,
                    url: post.url.clone(),
                })
            }
            Err(e) => Err(StorageError::from_sqlx(e)),
        }
    }

    /// Posts of one feed, newest first, capped at 2000
    pub async fn get_posts_for_feed(
        &self,
        feed_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Post>, StorageError> {
        let limit = limit.unwrap_or(500).min(MAX_POSTS);
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, feed_id, title, url, author, description, content, published_at, created_at
            FROM posts
            WHERE feed_id = ?
            ORDER BY published_at DESC, id DESC
            LIMIT ?
        "#,
        )
        .bind(feed_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from_sqlx)?;

        Ok(posts)
    }

    pub async fn count_posts(&self, feed_id: i64) -> Result<i64, StorageError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE feed_id = ?")
            .bind(feed_id)
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::from_sqlx)?;
        Ok(count)
    }
}
