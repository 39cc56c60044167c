//! Read fan-out: attach reviews to a page of recipes.
//!
//! One task per recipe, at most `max_concurrent` fetching at a time regardless
//! of page size. Results are merged into a shared map whose lock is held only
//! for the insert. A fetch that fails, times out, is cancelled or panics
//! leaves that recipe's `reviews` empty; the page itself never fails because
//! of review data.

use crate::cancel::CancelToken;
use crate::metrics::FanoutMetrics;
use futures::future::join_all;
use recipe_catalog_core::{Recipe, RecipeId, Review, ReviewStore, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Semaphore;

/// Fan-out width and per-fetch deadline.
#[derive(Debug, Clone)]
pub struct FanoutConfig {
    /// Maximum number of review fetches in flight at once.
    pub max_concurrent: usize,
    /// Deadline for a single recipe's review fetch, excluding the wait for a
    /// permit.
    pub fetch_timeout: Duration,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            fetch_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Error, Debug)]
enum FetchFailure {
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
    #[error("cancelled")]
    Cancelled,
}

type ReviewMap = Arc<Mutex<HashMap<RecipeId, Vec<Review>>>>;

/// Attaches reviews to recipes with bounded concurrency.
#[derive(Clone)]
pub struct ReviewAssembler {
    reviews: Arc<dyn ReviewStore>,
    permits: Arc<Semaphore>,
    config: FanoutConfig,
}

impl ReviewAssembler {
    /// Create an assembler reading from `reviews`. A width of zero is raised
    /// to one.
    #[must_use]
    pub fn new(reviews: Arc<dyn ReviewStore>, config: FanoutConfig) -> Self {
        let config = FanoutConfig {
            max_concurrent: config.max_concurrent.max(1),
            ..config
        };
        Self {
            reviews,
            permits: Arc::new(Semaphore::new(config.max_concurrent)),
            config,
        }
    }

    /// Maximum number of concurrent fetches.
    #[must_use]
    pub const fn max_concurrent(&self) -> usize {
        self.config.max_concurrent
    }

    /// Fill in `reviews` for every recipe, preserving input order.
    ///
    /// Waits for every fetch to finish or fail before returning.
    pub async fn assemble(&self, mut recipes: Vec<Recipe>, cancel: &CancelToken) -> Vec<Recipe> {
        if recipes.is_empty() {
            return recipes;
        }

        let start = Instant::now();
        let merged: ReviewMap = Arc::new(Mutex::new(HashMap::with_capacity(recipes.len())));
        let ids: Vec<RecipeId> = recipes.iter().map(|r| r.id).collect();

        let tasks = ids.iter().map(|&recipe_id| {
            let reviews = Arc::clone(&self.reviews);
            let permits = Arc::clone(&self.permits);
            let merged = Arc::clone(&merged);
            let cancel = cancel.clone();
            let fetch_timeout = self.config.fetch_timeout;

            tokio::spawn(async move {
                // A cancelled token always wins, even against a fetch that
                // is already complete.
                let outcome = tokio::select! {
                    biased;

                    () = cancel.cancelled() => Err(FetchFailure::Cancelled),
                    outcome = fetch_reviews(reviews, permits, recipe_id, fetch_timeout) => outcome,
                };

                match outcome {
                    Ok(list) => {
                        merged
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .insert(recipe_id, list);
                    }
                    Err(failure) => {
                        tracing::warn!(
                            recipe_id = %recipe_id,
                            reason = %failure,
                            "Review fetch failed, returning recipe without reviews"
                        );
                        FanoutMetrics::record_fetch_failure();
                    }
                }
            })
        });

        for (recipe_id, joined) in ids.iter().zip(join_all(tasks).await) {
            if let Err(e) = joined {
                tracing::error!(recipe_id = %recipe_id, error = %e, "Review fetch task panicked");
                FanoutMetrics::record_fetch_failure();
            }
        }

        let mut merged = std::mem::take(&mut *merged.lock().unwrap_or_else(PoisonError::into_inner));
        let fetched = merged.len();
        for recipe in &mut recipes {
            recipe.reviews = merged.remove(&recipe.id).unwrap_or_default();
        }

        let elapsed = start.elapsed();
        FanoutMetrics::record_assemble(elapsed);
        tracing::debug!(
            recipes = recipes.len(),
            fetched,
            elapsed_ms = elapsed.as_millis(),
            "Reviews assembled"
        );
        recipes
    }
}

async fn fetch_reviews(
    reviews: Arc<dyn ReviewStore>,
    permits: Arc<Semaphore>,
    recipe_id: RecipeId,
    fetch_timeout: Duration,
) -> Result<Vec<Review>, FetchFailure> {
    let _permit = permits
        .acquire_owned()
        .await
        .map_err(|_| FetchFailure::Cancelled)?;
    FanoutMetrics::record_fetch();

    tokio::time::timeout(fetch_timeout, reviews.select_reviews_by_recipe(recipe_id))
        .await
        .map_err(|_| FetchFailure::TimedOut(fetch_timeout))?
        .map_err(FetchFailure::from)
}

impl std::fmt::Debug for ReviewAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewAssembler")
            .field("config", &self.config)
            .field("available_permits", &self.permits.available_permits())
            .finish_non_exhaustive()
    }
}
