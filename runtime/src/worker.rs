//! The single aggregation worker behind the review queue.
//!
//! For each entry, strictly in order: insert the review, recompute the
//! recipe's aggregate from all of its reviews, then push the fresh aggregate
//! to the search index if one is attached. Failures are logged and counted,
//! never retried, and never reported to the submitter.

use crate::cancel::CancelToken;
use crate::metrics::IngestMetrics;
use recipe_catalog_core::{NewReview, RecipeStore, ReviewStore, SearchIndex};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::mpsc;

/// Backends shared by the ingestion worker and the read path.
#[derive(Clone)]
pub struct CatalogStores {
    pub(crate) reviews: Arc<dyn ReviewStore>,
    pub(crate) recipes: Arc<dyn RecipeStore>,
    pub(crate) search: Option<Arc<dyn SearchIndex>>,
}

impl CatalogStores {
    /// Stores without a search index.
    #[must_use]
    pub fn new(reviews: Arc<dyn ReviewStore>, recipes: Arc<dyn RecipeStore>) -> Self {
        Self {
            reviews,
            recipes,
            search: None,
        }
    }

    /// Use one backend for both recipes and reviews.
    #[must_use]
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: RecipeStore + ReviewStore + 'static,
    {
        let reviews: Arc<dyn ReviewStore> = store.clone();
        Self::new(reviews, store)
    }

    /// Push refreshed aggregates to `index` after every write.
    #[must_use]
    pub fn with_search(mut self, index: Arc<dyn SearchIndex>) -> Self {
        self.search = Some(index);
        self
    }
}

/// Counters shared between the worker and its ingestor.
#[derive(Debug, Default)]
pub(crate) struct WorkerStats {
    pub(crate) processed: AtomicU64,
    pub(crate) insert_failed: AtomicU64,
}

pub(crate) struct AggregationWorker {
    stores: CatalogStores,
    rx: mpsc::Receiver<NewReview>,
    drain: CancelToken,
    cancel: CancelToken,
    stats: Arc<WorkerStats>,
}

impl AggregationWorker {
    pub(crate) fn new(
        stores: CatalogStores,
        rx: mpsc::Receiver<NewReview>,
        drain: CancelToken,
        cancel: CancelToken,
        stats: Arc<WorkerStats>,
    ) -> Self {
        Self {
            stores,
            rx,
            drain,
            cancel,
            stats,
        }
    }

    /// Run until the queue is drained after a drain signal, or until
    /// cancelled. Returns the number of entries left unprocessed.
    pub(crate) async fn run(mut self) -> usize {
        tracing::info!("Aggregation worker started");
        let mut draining = false;

        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => {
                    let undrained = self.discard_remaining();
                    if undrained > 0 {
                        tracing::error!(undrained, "Aggregation worker cancelled with reviews still queued");
                    } else {
                        tracing::info!("Aggregation worker cancelled");
                    }
                    return undrained;
                }

                () = self.drain.cancelled(), if !draining => {
                    // Senders now fail; what is already buffered is still delivered.
                    self.rx.close();
                    draining = true;
                    tracing::info!(queued = self.rx.len(), "Aggregation worker draining");
                }

                entry = self.rx.recv() => {
                    let Some(review) = entry else {
                        tracing::info!("Aggregation worker drained and stopped");
                        return 0;
                    };
                    IngestMetrics::record_depth(self.rx.len());
                    self.process(review).await;
                }
            }
        }
    }

    fn discard_remaining(&mut self) -> usize {
        self.rx.close();
        let mut undrained = 0;
        while self.rx.try_recv().is_ok() {
            undrained += 1;
        }
        IngestMetrics::record_depth(0);
        undrained
    }

    async fn process(&self, review: NewReview) {
        let start = Instant::now();
        let recipe_id = review.recipe_id;

        let review_id = match self.stores.reviews.insert_review(&review).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    recipe_id = %recipe_id,
                    author_id = %review.author_id,
                    error = %e,
                    "Failed to insert review, dropping it"
                );
                IngestMetrics::record_insert_failure();
                self.stats.insert_failed.fetch_add(1, Ordering::Relaxed);
                self.finish(start);
                return;
            }
        };

        tracing::debug!(recipe_id = %recipe_id, review_id = %review_id, "Review inserted");

        match self.stores.recipes.recompute_aggregate(recipe_id).await {
            Ok(aggregate) => {
                tracing::debug!(
                    recipe_id = %recipe_id,
                    review_count = aggregate.review_count,
                    avg_rating = aggregate.avg_rating,
                    "Aggregate recomputed"
                );
                if let Some(search) = &self.stores.search {
                    if let Err(e) = search.update_aggregate(recipe_id, aggregate).await {
                        tracing::warn!(
                            recipe_id = %recipe_id,
                            error = %e,
                            "Failed to push aggregate to search index"
                        );
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    recipe_id = %recipe_id,
                    review_id = %review_id,
                    error = %e,
                    "Failed to recompute aggregate, leaving it stale"
                );
                IngestMetrics::record_recompute_failure();
            }
        }

        self.finish(start);
    }

    fn finish(&self, start: Instant) {
        self.stats.processed.fetch_add(1, Ordering::Release);
        IngestMetrics::record_processed(start.elapsed());
    }
}
