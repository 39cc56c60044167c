//! # Recipe Catalog Core
//!
//! Domain types and capability traits for the recipe catalog.
//!
//! This crate has no I/O of its own. It defines what a recipe and a review
//! look like, how submissions are validated, and the traits that storage,
//! search and image backends implement.
//!
//! ## Core Concepts
//!
//! - **Recipe**: catalog entry carrying a stored `review_count` / `avg_rating`
//! - **Review**: immutable rating + text, appended through the ingestion queue
//! - **`RecipeAggregate`**: count and mean derived from all reviews of a recipe
//! - **Stores**: [`store::ReviewStore`] and [`store::RecipeStore`], dyn-compatible
//!   so the runtime can hold them as `Arc<dyn ...>`
//! - **Search**: [`search::SearchIndex`], a secondary view fed after writes
//!
//! ## Example
//!
//! ```
//! use recipe_catalog_core::{NewReview, RecipeAggregate, RecipeId, UserId};
//!
//! let review = NewReview::new(RecipeId::new(1), UserId::new(7), 5, "Great");
//! assert!(review.validate().is_ok());
//!
//! let aggregate = RecipeAggregate::from_ratings([5, 3, 4]);
//! assert_eq!(aggregate.review_count, 3);
//! ```

pub use chrono::{DateTime, Utc};

/// Validation errors for submitted payloads.
pub mod error;

/// Typed identifiers.
pub mod ids;

/// Image upload storage capability.
pub mod images;

/// Recipes and recipe creation payloads.
pub mod recipe;

/// Reviews and derived aggregates.
pub mod review;

/// Search index capability and document format.
pub mod search;

/// Storage capabilities.
pub mod store;

pub use error::ValidationError;
pub use ids::{ParseIdError, RecipeId, ReviewId, UserId};
pub use images::{ImageError, ImageStore};
pub use recipe::{MAX_RECIPE_IMAGES, NewRecipe, Recipe};
pub use review::{MAX_RATING, MAX_REVIEW_TEXT_LEN, MIN_RATING, NewReview, RecipeAggregate, Review};
pub use search::{SearchDocument, SearchError, SearchFuture, SearchIndex};
pub use store::{RecipeStore, ReviewStore, StoreError, StoreFuture, page_offset};
