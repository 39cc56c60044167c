//! Axum HTTP layer for the recipe catalog.
//!
//! Handlers stay thin: they parse the request, call one
//! [`Catalog`](recipe_catalog_runtime::Catalog) operation and map its error
//! through [`AppError`].
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at an Axum handler
//! 2. **Extract data** from path, query, JSON body or multipart form
//! 3. **Call** the catalog (queue a review, assemble a page, query search)
//! 4. **Map result** to an HTTP response; `CatalogError` becomes `AppError`
//!
//! # Example
//!
//! ```ignore
//! use recipe_catalog_web::{build_router, AppState, LocalImageStore};
//!
//! let state = AppState::new(Arc::new(catalog), Arc::new(LocalImageStore::new("./uploads")));
//! let app = build_router(state);
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
pub mod uploads;

// Re-export key types for convenience
pub use error::AppError;
pub use middleware::{track_request, RequestId, REQUEST_ID_HEADER};
pub use router::{build_router, MAX_BODY_BYTES};
pub use state::AppState;
pub use uploads::LocalImageStore;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
