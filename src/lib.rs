//! Periodic RSS/Atom ingestion into SQLite.
//!
//! Feeds are fetched in small concurrent batches, normalized into a single
//! canonical shape and stored so each post is recorded exactly once per feed.

pub mod config;
pub mod feed;
pub mod storage;
