//! # Recipe Catalog Runtime
//!
//! The concurrent parts of the recipe catalog.
//!
//! ## Core Components
//!
//! - **`ReviewIngestor`**: bounded queue of pending review writes. Submitters
//!   wait only for queue space (backpressure), never for storage.
//! - **Aggregation worker**: the single consumer of that queue. Inserts each
//!   review, then recomputes the recipe's `review_count` / `avg_rating` from
//!   all of its reviews. Strict FIFO, so no lost updates.
//! - **`ReviewAssembler`**: read fan-out. Fetches reviews for a page of
//!   recipes concurrently, bounded by a semaphore, tolerating per-recipe
//!   failure and preserving page order.
//! - **`Catalog`**: the facade the HTTP layer calls.
//!
//! ## Example
//!
//! ```ignore
//! use recipe_catalog_runtime::{Catalog, CatalogConfig, CatalogStores};
//!
//! let catalog = Catalog::start(CatalogStores::from_store(store), CatalogConfig::default());
//!
//! catalog.submit_review(NewReview::new(recipe_id, author_id, 5, "Great")).await?;
//! let page = catalog.list_recipes(1, 10).await?;
//!
//! catalog.shutdown().await?;
//! ```

/// Cooperative cancellation
pub mod cancel;

/// Catalog facade
pub mod catalog;

/// Read fan-out assembler
pub mod fanout;

/// Health checks
pub mod health;

/// Review ingestion queue
pub mod ingest;

/// Prometheus metrics for observability
pub mod metrics;

/// Aggregation worker
pub mod worker;

pub use cancel::CancelToken;
pub use catalog::{Catalog, CatalogConfig, CatalogError, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use fanout::{FanoutConfig, ReviewAssembler};
pub use health::{HealthCheck, HealthReport, HealthStatus};
pub use ingest::{DrainReport, IngestConfig, IngestError, ReviewIngestor};
pub use worker::CatalogStores;
