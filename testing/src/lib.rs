//! # Recipe Catalog Testing
//!
//! Testing utilities for the recipe catalog.
//!
//! This crate provides:
//! - [`InMemoryCatalogStore`]: recipe + review storage with per-recipe fault
//!   injection, latency injection and concurrency probes
//! - [`InMemorySearchIndex`]: map-backed search index
//! - Fixtures and proptest strategies for domain types
//!
//! ## Example
//!
//! ```ignore
//! use recipe_catalog_testing::{InMemoryCatalogStore, new_recipe, review};
//! use recipe_catalog_runtime::{Catalog, CatalogConfig, CatalogStores};
//!
//! #[tokio::test]
//! async fn test_review_flow() {
//!     let store = Arc::new(InMemoryCatalogStore::new());
//!     let recipe = store.seed_recipe(new_recipe("Plov", UserId::new(1)));
//!     let catalog = Catalog::start(CatalogStores::from_store(store.clone()), CatalogConfig::default());
//!
//!     catalog.submit_review(review(recipe.id, 5)).await.unwrap();
//!     catalog.shutdown().await.unwrap();
//!
//!     assert_eq!(store.recipe(recipe.id).unwrap().review_count, 1);
//! }
//! ```

/// Fixtures and builders
pub mod fixtures;

/// In-memory search index
pub mod memory_search;

/// In-memory storage with fault injection
pub mod memory_store;

/// Property-based testing strategies using proptest.
pub mod properties {
    use proptest::prelude::*;
    use recipe_catalog_core::{MAX_RATING, MIN_RATING};

    /// A single valid rating.
    pub fn rating() -> impl Strategy<Value = i32> {
        MIN_RATING..=MAX_RATING
    }

    /// A non-empty sequence of valid ratings.
    pub fn ratings(max_len: usize) -> impl Strategy<Value = Vec<i32>> {
        prop::collection::vec(rating(), 1..=max_len.max(1))
    }
}

pub use fixtures::{init_tracing, new_recipe, review, test_time};
pub use memory_search::InMemorySearchIndex;
pub use memory_store::InMemoryCatalogStore;
