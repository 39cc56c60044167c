//! Bounded review ingestion queue.
//!
//! [`ReviewIngestor`] owns a bounded `mpsc` channel and the single
//! [`AggregationWorker`](crate::worker) that consumes it. Submitters only wait
//! for queue space; the insert and the aggregate refresh happen later on the
//! worker, and their failures are never reported back.
//!
//! # Ordering
//!
//! One channel with one consumer: entries are processed in submission order,
//! so reviews for the same recipe are applied first-submitted-first.
//!
//! # Shutdown
//!
//! [`ReviewIngestor::shutdown`] stops accepting, lets the worker drain what
//! is already queued, and cancels it if that takes longer than
//! `shutdown_timeout`.
//!
//! # Example
//!
//! ```ignore
//! let ingestor = ReviewIngestor::start(CatalogStores::new(reviews, recipes), IngestConfig::default());
//! ingestor.submit(NewReview::new(recipe_id, author_id, 5, "Great")).await?;
//! let report = ingestor.shutdown().await?;
//! ```

use crate::cancel::CancelToken;
use crate::health::{HealthCheck, ingest_health};
use crate::metrics::IngestMetrics;
use crate::worker::{AggregationWorker, CatalogStores, WorkerStats};
use recipe_catalog_core::{NewReview, ValidationError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Ingestion queue settings.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Maximum number of queued reviews before `submit` waits.
    pub capacity: usize,
    /// Upper bound on how long `submit` waits for queue space. `None` waits
    /// indefinitely.
    pub submit_timeout: Option<Duration>,
    /// How long `shutdown` lets the worker drain before cancelling it.
    pub shutdown_timeout: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            submit_timeout: None,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl IngestConfig {
    /// Set the queue capacity. Zero is raised to one.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Bound how long `submit` waits for queue space.
    #[must_use]
    pub const fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = Some(timeout);
        self
    }

    /// Set the drain deadline used by `shutdown`.
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Errors from the ingestion queue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// The review was rejected before reaching the queue.
    #[error("Invalid review: {0}")]
    Validation(#[from] ValidationError),

    /// Shutdown has begun; no new reviews are accepted.
    #[error("Review queue is shutting down")]
    ShuttingDown,

    /// The queue stayed full for longer than the submit timeout.
    #[error("Timed out after {0:?} waiting for review queue space")]
    SubmitTimeout(Duration),

    /// The worker did not drain the queue before the shutdown deadline.
    #[error("Shutdown timed out with {undrained} reviews not processed")]
    ShutdownTimeout {
        /// Entries still queued when the worker was cancelled.
        undrained: usize,
    },

    /// The worker task panicked.
    #[error("Aggregation worker panicked: {0}")]
    WorkerPanicked(String),
}

/// Outcome of a clean shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// Entries the worker finished handling over its lifetime.
    pub processed: u64,
    /// Entries dropped because their insert failed.
    pub failed: u64,
}

/// Bounded queue of pending review writes and its single worker.
pub struct ReviewIngestor {
    tx: mpsc::Sender<NewReview>,
    config: IngestConfig,
    closing: AtomicBool,
    drain: CancelToken,
    cancel: CancelToken,
    stats: Arc<WorkerStats>,
    worker: Mutex<Option<JoinHandle<usize>>>,
}

impl ReviewIngestor {
    /// Create the queue and spawn its worker.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(stores: CatalogStores, config: IngestConfig) -> Self {
        let capacity = config.capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let drain = CancelToken::new();
        let cancel = CancelToken::new();
        let stats = Arc::new(WorkerStats::default());

        let worker = AggregationWorker::new(stores, rx, drain.clone(), cancel.clone(), Arc::clone(&stats));
        let handle = tokio::spawn(worker.run());

        tracing::info!(
            capacity,
            submit_timeout = ?config.submit_timeout,
            "Review ingestor started"
        );

        Self {
            tx,
            config,
            closing: AtomicBool::new(false),
            drain,
            cancel,
            stats,
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Enqueue a review for insertion.
    ///
    /// Waits while the queue is full. Returns once the review is queued, not
    /// once it is stored.
    ///
    /// # Errors
    ///
    /// - [`IngestError::Validation`] if the payload is malformed
    /// - [`IngestError::ShuttingDown`] once shutdown has begun
    /// - [`IngestError::SubmitTimeout`] if a submit timeout is configured and
    ///   the queue stays full that long
    pub async fn submit(&self, review: NewReview) -> Result<(), IngestError> {
        review.validate()?;

        if self.closing.load(Ordering::Acquire) {
            return Err(IngestError::ShuttingDown);
        }

        let recipe_id = review.recipe_id;
        let send = self.tx.send(review);
        let sent = match self.config.submit_timeout {
            Some(limit) => match tokio::time::timeout(limit, send).await {
                Ok(sent) => sent,
                Err(_) => {
                    tracing::warn!(
                        recipe_id = %recipe_id,
                        timeout_ms = limit.as_millis(),
                        "Review queue full, submit timed out"
                    );
                    return Err(IngestError::SubmitTimeout(limit));
                }
            },
            None => send.await,
        };
        sent.map_err(|_| IngestError::ShuttingDown)?;

        IngestMetrics::record_submitted();
        IngestMetrics::record_depth(self.depth());
        tracing::debug!(recipe_id = %recipe_id, depth = self.depth(), "Review queued");
        Ok(())
    }

    /// Number of reviews waiting on the queue.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Maximum queue length.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Whether the worker task is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Health of the queue and its worker.
    #[must_use]
    pub fn health(&self) -> HealthCheck {
        ingest_health(self.depth(), self.capacity(), self.is_running())
    }

    /// Stop accepting, drain, and stop the worker.
    ///
    /// # Errors
    ///
    /// - [`IngestError::ShuttingDown`] if shutdown was already called
    /// - [`IngestError::ShutdownTimeout`] if draining exceeded
    ///   `shutdown_timeout`; the worker is cancelled and the remaining entries
    ///   are dropped
    /// - [`IngestError::WorkerPanicked`] if the worker task panicked
    pub async fn shutdown(&self) -> Result<DrainReport, IngestError> {
        self.closing.store(true, Ordering::Release);

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut handle) = handle else {
            return Err(IngestError::ShuttingDown);
        };

        tracing::info!(
            queued = self.depth(),
            timeout_ms = self.config.shutdown_timeout.as_millis(),
            "Shutting down review ingestor"
        );
        self.drain.cancel();

        if let Ok(joined) = tokio::time::timeout(self.config.shutdown_timeout, &mut handle).await {
            joined.map_err(|e| IngestError::WorkerPanicked(e.to_string()))?;
        } else {
            tracing::error!(
                queued = self.depth(),
                "Review queue did not drain in time, cancelling worker"
            );
            self.cancel.cancel();
            // The worker only stops between entries; give the current one
            // the same deadline before aborting it.
            let undrained =
                match tokio::time::timeout(self.config.shutdown_timeout, &mut handle).await {
                    Ok(joined) => {
                        joined.map_err(|e| IngestError::WorkerPanicked(e.to_string()))?
                    }
                    Err(_) => {
                        handle.abort();
                        self.depth()
                    }
                };
            return Err(IngestError::ShutdownTimeout { undrained });
        }

        let report = self.report();
        tracing::info!(
            processed = report.processed,
            failed = report.failed,
            "Review ingestor drained"
        );
        Ok(report)
    }

    /// Lifetime counters of the worker.
    #[must_use]
    pub fn report(&self) -> DrainReport {
        DrainReport {
            processed: self.stats.processed.load(Ordering::Acquire),
            failed: self.stats.insert_failed.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for ReviewIngestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewIngestor")
            .field("capacity", &self.capacity())
            .field("depth", &self.depth())
            .field("closing", &self.closing.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
