//! # Recipe Catalog Search
//!
//! Typesense implementation of the catalog's [`SearchIndex`] capability.
//!
//! ## Example
//!
//! ```no_run
//! use recipe_catalog_core::SearchIndex;
//! use recipe_catalog_search::{TypesenseConfig, TypesenseIndex};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let index = TypesenseIndex::new(TypesenseConfig::new("http://localhost:8108", "xyz"));
//!     index.ensure_collection().await?;
//!
//!     for doc in index.search("plov").await? {
//!         println!("{} ({:.1})", doc.name, doc.avg_rating);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! [`SearchIndex`]: recipe_catalog_core::SearchIndex

pub mod client;
pub mod types;

pub use client::{TypesenseConfig, TypesenseIndex};
pub use types::{CollectionSchema, DEFAULT_COLLECTION};
