//! In-memory catalog storage with fault and latency injection.
//!
//! [`InMemoryCatalogStore`] implements both [`RecipeStore`] and
//! [`ReviewStore`] over plain maps, so runtime tests can exercise the
//! ingestion worker and the read fan-out without a database. Faults are
//! injected per recipe id; probes record how the runtime drove the store.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Locks only panic if a test already panicked

use crate::fixtures::test_time;
use recipe_catalog_core::store::{StoreFuture, page_offset};
use recipe_catalog_core::{
    NewRecipe, NewReview, Recipe, RecipeAggregate, RecipeId, RecipeStore, Review, ReviewId,
    ReviewStore, StoreError, UserId,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Default)]
struct Data {
    recipes: BTreeMap<RecipeId, Recipe>,
    reviews: Vec<Review>,
    users: HashMap<UserId, String>,
    next_recipe_id: i64,
    next_review_id: i64,
}

#[derive(Debug, Default)]
struct Faults {
    failing_fetches: HashSet<RecipeId>,
    hanging_fetches: HashSet<RecipeId>,
    failing_inserts: HashSet<RecipeId>,
    failing_recomputes: HashSet<RecipeId>,
    fail_page_queries: bool,
    fetch_delay: Duration,
    insert_delay: Duration,
}

#[derive(Debug, Default)]
struct Probes {
    in_flight_fetches: AtomicUsize,
    max_in_flight_fetches: AtomicUsize,
    fetch_calls: AtomicUsize,
    insert_calls: AtomicUsize,
}

#[derive(Debug)]
struct Inner {
    data: RwLock<Data>,
    faults: RwLock<Faults>,
    probes: Probes,
    inserts_paused: watch::Sender<bool>,
}

/// In-memory recipe and review storage for fast, deterministic tests.
///
/// Clones share the same data.
///
/// # Example
///
/// ```
/// use recipe_catalog_testing::{InMemoryCatalogStore, new_recipe};
/// use recipe_catalog_core::{NewReview, RecipeStore, ReviewStore, UserId};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryCatalogStore::new();
/// let recipe = store.seed_recipe(new_recipe("Plov", UserId::new(1)));
///
/// store.insert_review(&NewReview::new(recipe.id, UserId::new(2), 5, "Great")).await?;
/// let aggregate = store.recompute_aggregate(recipe.id).await?;
/// assert_eq!(aggregate.review_count, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryCatalogStore {
    inner: Arc<Inner>,
}

impl InMemoryCatalogStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (inserts_paused, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                data: RwLock::new(Data {
                    next_recipe_id: 1,
                    next_review_id: 1,
                    ..Data::default()
                }),
                faults: RwLock::new(Faults::default()),
                probes: Probes::default(),
                inserts_paused,
            }),
        }
    }

    // --- Seeding -----------------------------------------------------------

    /// Register a user so listings can join the author's name.
    pub fn add_user(&self, id: UserId, name: impl Into<String>) {
        self.inner.data.write().unwrap().users.insert(id, name.into());
    }

    /// Store a recipe synchronously and return it.
    pub fn seed_recipe(&self, recipe: NewRecipe) -> Recipe {
        let mut data = self.inner.data.write().unwrap();
        let id = RecipeId::new(data.next_recipe_id);
        data.next_recipe_id += 1;
        let stored = recipe.into_recipe(id, test_time());
        data.recipes.insert(id, stored.clone());
        stored
    }

    /// Store a review synchronously without touching the aggregate.
    pub fn seed_review(&self, review: &NewReview) -> Review {
        push_review(&mut self.inner.data.write().unwrap(), review)
    }

    // --- Inspection --------------------------------------------------------

    /// The stored recipe row, aggregates as last persisted.
    #[must_use]
    pub fn recipe(&self, id: RecipeId) -> Option<Recipe> {
        self.inner.data.read().unwrap().recipes.get(&id).cloned()
    }

    /// Stored reviews of a recipe in insertion order.
    #[must_use]
    pub fn reviews_for(&self, id: RecipeId) -> Vec<Review> {
        self.inner
            .data
            .read()
            .unwrap()
            .reviews
            .iter()
            .filter(|r| r.recipe_id == id)
            .cloned()
            .collect()
    }

    /// Total number of stored reviews.
    #[must_use]
    pub fn review_total(&self) -> usize {
        self.inner.data.read().unwrap().reviews.len()
    }

    /// Highest number of review fetches observed in flight at once.
    #[must_use]
    pub fn max_in_flight_fetches(&self) -> usize {
        self.inner.probes.max_in_flight_fetches.load(Ordering::SeqCst)
    }

    /// Review fetches currently in flight.
    #[must_use]
    pub fn in_flight_fetches(&self) -> usize {
        self.inner.probes.in_flight_fetches.load(Ordering::SeqCst)
    }

    /// Number of `select_reviews_by_recipe` calls.
    #[must_use]
    pub fn fetch_calls(&self) -> usize {
        self.inner.probes.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of `insert_review` calls, successful or not.
    #[must_use]
    pub fn insert_calls(&self) -> usize {
        self.inner.probes.insert_calls.load(Ordering::SeqCst)
    }

    // --- Fault injection ---------------------------------------------------

    /// Make review fetches for `id` fail.
    pub fn fail_fetch_for(&self, id: RecipeId) {
        self.inner.faults.write().unwrap().failing_fetches.insert(id);
    }

    /// Make review fetches for `id` never complete.
    pub fn hang_fetch_for(&self, id: RecipeId) {
        self.inner.faults.write().unwrap().hanging_fetches.insert(id);
    }

    /// Delay every review fetch.
    pub fn set_fetch_delay(&self, delay: Duration) {
        self.inner.faults.write().unwrap().fetch_delay = delay;
    }

    /// Make review inserts for `id` fail.
    pub fn fail_inserts_for(&self, id: RecipeId) {
        self.inner.faults.write().unwrap().failing_inserts.insert(id);
    }

    /// Delay every review insert.
    pub fn set_insert_delay(&self, delay: Duration) {
        self.inner.faults.write().unwrap().insert_delay = delay;
    }

    /// Make aggregate recomputes for `id` fail.
    pub fn fail_recompute_for(&self, id: RecipeId) {
        self.inner.faults.write().unwrap().failing_recomputes.insert(id);
    }

    /// Let aggregate recomputes for `id` succeed again.
    pub fn heal_recompute_for(&self, id: RecipeId) {
        self.inner.faults.write().unwrap().failing_recomputes.remove(&id);
    }

    /// Make page and single-recipe queries fail.
    pub fn fail_page_queries(&self, fail: bool) {
        self.inner.faults.write().unwrap().fail_page_queries = fail;
    }

    /// Block every `insert_review` until [`Self::resume_inserts`].
    pub fn pause_inserts(&self) {
        self.inner.inserts_paused.send_replace(true);
    }

    /// Release inserts blocked by [`Self::pause_inserts`].
    pub fn resume_inserts(&self) {
        self.inner.inserts_paused.send_replace(false);
    }

    fn page_query_fault(&self) -> Result<(), StoreError> {
        if self.inner.faults.read().unwrap().fail_page_queries {
            Err(StoreError::Database("injected page query failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn with_author_name(&self, mut recipe: Recipe) -> Recipe {
        recipe.author_name = self
            .inner
            .data
            .read()
            .unwrap()
            .users
            .get(&recipe.author_id)
            .cloned();
        recipe.reviews.clear();
        recipe
    }

    fn page<F>(&self, page: u32, page_size: u32, keep: F) -> Vec<Recipe>
    where
        F: Fn(&Recipe) -> bool,
    {
        let offset = usize::try_from(page_offset(page, page_size)).unwrap_or(usize::MAX);
        let rows: Vec<Recipe> = self
            .inner
            .data
            .read()
            .unwrap()
            .recipes
            .values()
            .rev()
            .filter(|r| keep(r))
            .skip(offset)
            .take(page_size as usize)
            .cloned()
            .collect();
        rows.into_iter().map(|r| self.with_author_name(r)).collect()
    }
}

impl Default for InMemoryCatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

fn push_review(data: &mut Data, review: &NewReview) -> Review {
    let id = ReviewId::new(data.next_review_id);
    data.next_review_id += 1;
    let stored = Review {
        id,
        text: review.text.clone(),
        rating_value: review.rating_value,
        recipe_id: review.recipe_id,
        author_id: review.author_id,
    };
    data.reviews.push(stored.clone());
    stored
}

/// Decrements the in-flight counter even if the fetch future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ReviewStore for InMemoryCatalogStore {
    fn insert_review<'a>(&'a self, review: &'a NewReview) -> StoreFuture<'a, ReviewId> {
        Box::pin(async move {
            self.inner.probes.insert_calls.fetch_add(1, Ordering::SeqCst);

            let mut paused = self.inner.inserts_paused.subscribe();
            let _ = paused.wait_for(|p| !*p).await;

            let (delay, fail) = {
                let faults = self.inner.faults.read().unwrap();
                (
                    faults.insert_delay,
                    faults.failing_inserts.contains(&review.recipe_id),
                )
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if fail {
                return Err(StoreError::Database(format!(
                    "injected insert failure for recipe {}",
                    review.recipe_id
                )));
            }

            let mut data = self.inner.data.write().unwrap();
            if !data.recipes.contains_key(&review.recipe_id) {
                return Err(StoreError::NotFound(format!("recipe {}", review.recipe_id)));
            }
            Ok(push_review(&mut data, review).id)
        })
    }

    fn select_reviews_by_recipe(&self, recipe_id: RecipeId) -> StoreFuture<'_, Vec<Review>> {
        Box::pin(async move {
            let probes = &self.inner.probes;
            probes.fetch_calls.fetch_add(1, Ordering::SeqCst);
            let now = probes.in_flight_fetches.fetch_add(1, Ordering::SeqCst) + 1;
            probes.max_in_flight_fetches.fetch_max(now, Ordering::SeqCst);
            let _in_flight = InFlight(&probes.in_flight_fetches);

            let (delay, fail, hang) = {
                let faults = self.inner.faults.read().unwrap();
                (
                    faults.fetch_delay,
                    faults.failing_fetches.contains(&recipe_id),
                    faults.hanging_fetches.contains(&recipe_id),
                )
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if hang {
                std::future::pending::<()>().await;
            }
            if fail {
                return Err(StoreError::Database(format!(
                    "injected fetch failure for recipe {recipe_id}"
                )));
            }

            Ok(self.reviews_for(recipe_id))
        })
    }
}

impl RecipeStore for InMemoryCatalogStore {
    fn recompute_aggregate(&self, recipe_id: RecipeId) -> StoreFuture<'_, RecipeAggregate> {
        Box::pin(async move {
            if self
                .inner
                .faults
                .read()
                .unwrap()
                .failing_recomputes
                .contains(&recipe_id)
            {
                return Err(StoreError::Database(format!(
                    "injected recompute failure for recipe {recipe_id}"
                )));
            }

            let mut data = self.inner.data.write().unwrap();
            let aggregate = RecipeAggregate::from_ratings(
                data.reviews
                    .iter()
                    .filter(|r| r.recipe_id == recipe_id)
                    .map(|r| r.rating_value),
            );
            let recipe = data
                .recipes
                .get_mut(&recipe_id)
                .ok_or_else(|| StoreError::NotFound(format!("recipe {recipe_id}")))?;
            recipe.set_aggregate(aggregate);
            Ok(aggregate)
        })
    }

    fn select_recipes_page(&self, page: u32, page_size: u32) -> StoreFuture<'_, Vec<Recipe>> {
        Box::pin(async move {
            self.page_query_fault()?;
            Ok(self.page(page, page_size, |_| true))
        })
    }

    fn select_recipe_by_id(&self, recipe_id: RecipeId) -> StoreFuture<'_, Option<Recipe>> {
        Box::pin(async move {
            self.page_query_fault()?;
            Ok(self.recipe(recipe_id).map(|r| self.with_author_name(r)))
        })
    }

    fn insert_recipe<'a>(&'a self, recipe: &'a NewRecipe) -> StoreFuture<'a, Recipe> {
        Box::pin(async move {
            let stored = self.seed_recipe(recipe.clone());
            Ok(self.with_author_name(stored))
        })
    }

    fn select_recipes_by_author(
        &self,
        author_id: UserId,
        page: u32,
        page_size: u32,
    ) -> StoreFuture<'_, Vec<Recipe>> {
        Box::pin(async move {
            self.page_query_fault()?;
            Ok(self.page(page, page_size, |r| r.author_id == author_id))
        })
    }
}
