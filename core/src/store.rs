//! Storage capabilities used by the ingestion worker and the read fan-out.
//!
//! Two narrow traits instead of one repository object: the worker needs
//! `insert_review` + `recompute_aggregate`, the fan-out only needs
//! `select_reviews_by_recipe`. Backends usually implement both.
//!
//! # Example
//!
//! ```ignore
//! use recipe_catalog_core::store::{RecipeStore, ReviewStore};
//!
//! async fn write<S: RecipeStore + ReviewStore>(store: &S, review: &NewReview) -> Result<(), StoreError> {
//!     store.insert_review(review).await?;
//!     let aggregate = store.recompute_aggregate(review.recipe_id).await?;
//!     println!("{} reviews, avg {}", aggregate.review_count, aggregate.avg_rating);
//!     Ok(())
//! }
//! ```

use crate::ids::{RecipeId, ReviewId, UserId};
use crate::recipe::{NewRecipe, Recipe};
use crate::review::{NewReview, RecipeAggregate, Review};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by the storage traits.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Errors that can occur during storage operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The referenced row does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(String),

    /// Column data could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Review persistence.
///
/// # Dyn Compatibility
///
/// Methods return explicit `Pin<Box<dyn Future>>` so the trait can be used as
/// `Arc<dyn ReviewStore>` by the worker and the fan-out tasks.
pub trait ReviewStore: Send + Sync {
    /// Insert one review and return its storage id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails, e.g. the recipe does not
    /// exist or the database is unreachable.
    fn insert_review<'a>(&'a self, review: &'a NewReview) -> StoreFuture<'a, ReviewId>;

    /// All reviews of one recipe. Order is unspecified.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn select_reviews_by_recipe(&self, recipe_id: RecipeId) -> StoreFuture<'_, Vec<Review>>;
}

/// Recipe persistence.
pub trait RecipeStore: Send + Sync {
    /// Recompute `review_count` and `avg_rating` from all stored reviews of
    /// the recipe, persist them onto the recipe row, and return the result.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails. The stored aggregate is
    /// then left as it was.
    fn recompute_aggregate(&self, recipe_id: RecipeId) -> StoreFuture<'_, RecipeAggregate>;

    /// One page of recipes, newest (highest id) first, with `reviews` empty.
    ///
    /// `page` starts at 1; the offset is `(page - 1) * page_size`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn select_recipes_page(&self, page: u32, page_size: u32) -> StoreFuture<'_, Vec<Recipe>>;

    /// One recipe by id, `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn select_recipe_by_id(&self, recipe_id: RecipeId) -> StoreFuture<'_, Option<Recipe>>;

    /// Insert a recipe and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    fn insert_recipe<'a>(&'a self, recipe: &'a NewRecipe) -> StoreFuture<'a, Recipe>;

    /// One page of an author's recipes, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn select_recipes_by_author(
        &self,
        author_id: UserId,
        page: u32,
        page_size: u32,
    ) -> StoreFuture<'_, Vec<Recipe>>;
}

/// Row offset for a 1-based page.
#[must_use]
pub const fn page_offset(page: u32, page_size: u32) -> u64 {
    (page.saturating_sub(1) as u64) * page_size as u64
}
