//! Periodic batch scheduler.
//!
//! Each tick selects up to `batch_size` due feeds, ingests them concurrently
//! and waits for the whole batch. A tick that fires while a batch is still
//! running is dropped, so a feed is never part of two in-flight batches.

use crate::feed::ingest::{IngestResult, Ingestor};
use crate::storage::FeedStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Fetching,
}

/// What a single tick did.
#[derive(Debug)]
pub enum TickOutcome {
    /// A previous batch was still running
    Skipped,
    Completed(BatchReport),
}

/// Results of one batch, in completion order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<IngestResult>,
    /// Workers that panicked instead of returning a result
    pub panicked: usize,
}

impl BatchReport {
    pub fn items_written(&self) -> usize {
        self.results.iter().map(|r| r.items_written).sum()
    }

    pub fn failed_feeds(&self) -> usize {
        self.results.iter().filter(|r| r.feed_failed()).count() + self.panicked
    }
}

/// Clears the fetching flag when the batch ends, including on cancellation.
struct FetchingGuard<'a>(&'a AtomicBool);

impl Drop for FetchingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Scheduler<S> {
    ingestor: Arc<Ingestor<S>>,
    interval: Duration,
    batch_size: usize,
    fetching: AtomicBool,
}

impl<S: FeedStore + 'static> Scheduler<S> {
    pub fn new(ingestor: Arc<Ingestor<S>>, interval: Duration, batch_size: usize) -> Self {
        Self {
            ingestor,
            interval,
            batch_size,
            fetching: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.fetching.load(Ordering::Acquire) {
            SchedulerState::Fetching
        } else {
            SchedulerState::Idle
        }
    }

    /// Tick forever. The first tick fires immediately.
    ///
    /// Returns only when the surrounding task is cancelled.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            batch_size = self.batch_size,
            "Scheduler started"
        );

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// Run one batch, unless one is already in flight.
    pub async fn tick(&self) -> TickOutcome {
        if self
            .fetching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Previous batch still running, dropping tick");
            return TickOutcome::Skipped;
        }
        let _guard = FetchingGuard(&self.fetching);

        TickOutcome::Completed(self.run_batch().await)
    }

    async fn run_batch(&self) -> BatchReport {
        let mut report = BatchReport::default();

        let feeds = match self
            .ingestor
            .store()
            .feeds_due_for_fetch(self.batch_size)
            .await
        {
            Ok(feeds) => feeds,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to select feeds for fetching");
                return report;
            }
        };

        if feeds.is_empty() {
            tracing::debug!("No feeds due for fetching");
            return report;
        }

        let count = feeds.len();
        tracing::info!(feeds = count, "Fetching feeds");

        let mut tasks = JoinSet::new();
        for feed in feeds {
            let ingestor = Arc::clone(&self.ingestor);
            tasks.spawn(async move { ingestor.ingest_one(feed.id, &feed.url).await });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => report.results.push(result),
                Err(e) => {
                    tracing::error!(error = %e, "Ingestion worker panicked");
                    report.panicked += 1;
                }
            }
        }

        tracing::info!(
            feeds = count,
            written = report.items_written(),
            failed = report.failed_feeds(),
            "Batch complete"
        );
        report
    }
}
