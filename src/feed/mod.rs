//! Feed ingestion pipeline.
//!
//! - [`time`] - Publish date normalization to Unix seconds
//! - [`parser`] - RSS 2.0 and Atom 1.0 decoding into canonical types
//! - [`fetcher`] - HTTP retrieval with a fixed User-Agent and size cap
//! - [`ingest`] - Per-feed fetch, dedup and persistence
//! - [`scheduler`] - Periodic batches of due feeds
//!
//! # Example
//!
//! ```no_run
//! use nyusu::config::Config;
//! use nyusu::feed::{Fetcher, Ingestor, Scheduler};
//! use nyusu::storage::Database;
//! use std::sync::Arc;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = Config::default();
//! let db = Arc::new(Database::open(&config.database_path).await?);
//! let fetcher = Fetcher::new(&config.fetch_config())?;
//! let ingestor = Arc::new(Ingestor::new(db, fetcher));
//!
//! ingestor.subscribe("https://blog.rust-lang.org/feed.xml").await?;
//!
//! let scheduler = Scheduler::new(ingestor, config.tick_interval(), config.batch_size);
//! scheduler.run().await;
//! # Ok(())
//! # }
//! ```

mod fetcher;
mod ingest;
mod parser;
mod scheduler;
mod time;

pub use fetcher::{FetchError, Fetcher};
pub use ingest::{IngestError, IngestResult, Ingestor, SubscribeError, Subscription};
pub use parser::{
    parse, AtomDoc, CanonicalEntry, CanonicalFeed, FeedFormat, FeedImage, ParseError, RssDoc,
    SNIPPET_CHARS,
};
pub use scheduler::{BatchReport, Scheduler, SchedulerState, TickOutcome};
pub use time::parse_time;
