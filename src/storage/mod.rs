//! Persistence for feeds and posts.
//!
//! The ingestion pipeline talks to storage only through the [`FeedStore`]
//! trait; [`Database`] is the SQLite implementation.

mod feeds;
mod posts;
mod schema;
mod store;
mod types;

pub use schema::Database;
pub use store::FeedStore;
pub use types::{Feed, FeedMetadata, FeedRef, NewPost, Post, StorageError};
