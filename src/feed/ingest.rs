//! Per-feed ingestion: fetch, normalize, persist.
//!
//! A feed is marked fetched only after a successful fetch and parse, so a
//! failing feed stays at the front of the due queue and is retried on the
//! next pass. Entry-level failures never abort the rest of the feed.

use crate::feed::fetcher::{FetchError, Fetcher};
use crate::feed::parser::{CanonicalEntry, CanonicalFeed};
use crate::feed::time::parse_time;
use crate::storage::{FeedMetadata, FeedStore, NewPost, StorageError};
use std::sync::Arc;
use thiserror::Error;

/// A failure recorded while ingesting one feed.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The feed could not be fetched or parsed; nothing was written
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),
    /// The fetch succeeded but the feed could not be marked fetched
    #[error("Failed to mark feed fetched: {0}")]
    MarkFetched(#[source] StorageError),
    /// One entry could not be stored; the other entries were still processed
    #[error("Failed to store post {url}: {source}")]
    Post {
        url: String,
        #[source]
        source: StorageError,
    },
}

/// Outcome of ingesting one feed.
#[derive(Debug)]
pub struct IngestResult {
    pub feed_id: i64,
    /// Newly stored posts
    pub items_written: usize,
    /// Entries already stored by an earlier pass
    pub duplicates: usize,
    /// Entries without a URL, which cannot be deduplicated
    pub skipped: usize,
    pub errors: Vec<IngestError>,
}

impl IngestResult {
    fn new(feed_id: i64) -> Self {
        Self {
            feed_id,
            items_written: 0,
            duplicates: 0,
            skipped: 0,
            errors: Vec::new(),
        }
    }

    /// True if the feed itself could not be ingested (as opposed to
    /// individual entries failing).
    pub fn feed_failed(&self) -> bool {
        self.errors
            .iter()
            .any(|e| matches!(e, IngestError::Fetch(_) | IngestError::MarkFetched(_)))
    }
}

/// Errors from [`Ingestor::subscribe`].
#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Failed to store feed: {0}")]
    Storage(#[from] StorageError),
}

/// A feed added by [`Ingestor::subscribe`] and its first population.
#[derive(Debug)]
pub struct Subscription {
    pub feed_id: i64,
    pub ingest: IngestResult,
}

/// Runs ingestion for single feeds against a [`FeedStore`].
pub struct Ingestor<S> {
    store: Arc<S>,
    fetcher: Fetcher,
}

impl<S: FeedStore> Ingestor<S> {
    pub fn new(store: Arc<S>, fetcher: Fetcher) -> Self {
        Self { store, fetcher }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Fetch one feed and persist its new entries.
    ///
    /// Never fails as a whole: fetch, parse and storage failures are logged
    /// and collected in [`IngestResult::errors`].
    pub async fn ingest_one(&self, feed_id: i64, url: &str) -> IngestResult {
        match self.fetcher.fetch(url).await {
            Ok(feed) => self.materialize(feed_id, feed).await,
            Err(e) => {
                tracing::warn!(feed_id = feed_id, url = %url, error = %e, "Failed to fetch feed");
                let mut result = IngestResult::new(feed_id);
                result.errors.push(e.into());
                result
            }
        }
    }

    /// Ingest a feed right away instead of waiting for the scheduler.
    ///
    /// Used when a feed has just been added so it has posts immediately.
    pub async fn fetch_one_feed_now(&self, feed_id: i64, url: &str) -> IngestResult {
        tracing::info!(feed_id = feed_id, url = %url, "Fetching feed now");
        self.ingest_one(feed_id, url).await
    }

    /// Add a feed by URL and populate it from the same fetch.
    ///
    /// The feed row is created (or its metadata refreshed, if the URL is
    /// already known) from the channel-level fields of the document.
    ///
    /// # Errors
    ///
    /// Fails without touching storage if the URL is not http(s) or the
    /// document cannot be fetched and parsed. Entry-level failures are
    /// reported in the returned [`IngestResult`] instead.
    pub async fn subscribe(&self, url: &str) -> Result<Subscription, SubscribeError> {
        let parsed = url::Url::parse(url.trim())?;
        match parsed.scheme() {
            "http" | "https" => {}
            scheme => return Err(SubscribeError::UnsupportedScheme(scheme.to_owned())),
        }
        let url = parsed.as_str();

        let feed = self.fetcher.fetch(url).await?;
        let feed_id = self.store.create_feed(url, &feed_metadata(&feed)).await?;
        tracing::info!(feed_id = feed_id, url = %url, title = %feed.title, "Subscribed to feed");

        let ingest = self.materialize(feed_id, feed).await;
        Ok(Subscription { feed_id, ingest })
    }

    /// Mark the feed fetched, then store its entries in document order.
    async fn materialize(&self, feed_id: i64, feed: CanonicalFeed) -> IngestResult {
        let mut result = IngestResult::new(feed_id);

        if let Err(e) = self.store.mark_feed_fetched(feed_id).await {
            tracing::warn!(feed_id = feed_id, error = %e, "Failed to mark feed fetched");
            result.errors.push(IngestError::MarkFetched(e));
            return result;
        }

        for entry in feed.items {
            self.persist_entry(feed_id, entry, &mut result).await;
        }

        tracing::debug!(
            feed_id = feed_id,
            written = result.items_written,
            duplicates = result.duplicates,
            skipped = result.skipped,
            errors = result.errors.len(),
            "Feed ingested"
        );
        result
    }

    async fn persist_entry(&self, feed_id: i64, entry: CanonicalEntry, result: &mut IngestResult) {
        if entry.url.is_empty() {
            tracing::debug!(feed_id = feed_id, title = %entry.title, "Skipping entry without URL");
            result.skipped += 1;
            return;
        }

        let published_at = match parse_time(&entry.published_raw) {
            Some(ts) => ts,
            None => {
                if !entry.published_raw.is_empty() {
                    tracing::debug!(
                        feed_id = feed_id,
                        raw = %entry.published_raw,
                        "Unrecognized publish date, storing as unknown"
                    );
                }
                0
            }
        };

        let post = NewPost {
            feed_id,
            title: entry.title,
            url: entry.url,
            author: non_empty(entry.author),
            description: non_empty(entry.description),
            content: non_empty(entry.content),
            published_at,
        };

        match self.store.create_post(&post).await {
            Ok(_) => result.items_written += 1,
            Err(e) if e.is_duplicate() => {
                tracing::debug!(feed_id = feed_id, url = %post.url, "Post already stored");
                result.duplicates += 1;
            }
            Err(e) => {
                tracing::warn!(feed_id = feed_id, url = %post.url, error = %e, "Failed to store post");
                result.errors.push(IngestError::Post {
                    url: post.url,
                    source: e,
                });
            }
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn feed_metadata(feed: &CanonicalFeed) -> FeedMetadata {
    FeedMetadata {
        name: feed.title.clone(),
        link: non_empty(feed.link.clone()),
        description: non_empty(feed.description.clone()),
        language: non_empty(feed.language.clone()),
        image_url: non_empty(feed.image.url.clone()),
        image_title: non_empty(feed.image.title.clone()),
    }
}
