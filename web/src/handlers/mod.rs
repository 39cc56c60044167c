//! HTTP request handlers.
//!
//! This module contains all HTTP handlers organized by resource.

pub mod health;
pub mod recipes;
pub mod reviews;
pub mod search;

// Re-export common handler utilities
pub use health::{health_check, readiness};
