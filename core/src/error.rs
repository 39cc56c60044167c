//! Validation errors raised at the submission boundary.
//!
//! Everything that reaches the ingestion worker or the storage layer has
//! already passed through one of these checks, so downstream code never
//! re-validates.

use thiserror::Error;

/// A malformed request payload.
///
/// Validation failures are the only errors a review submitter ever sees;
/// storage failures on the write path are handled by the aggregation worker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Rating outside the accepted `1..=5` range.
    #[error("Rating must be between {min} and {max}, got {value}")]
    RatingOutOfRange {
        /// The rejected rating.
        value: i32,
        /// Lowest accepted rating.
        min: i32,
        /// Highest accepted rating.
        max: i32,
    },

    /// Review text is empty or whitespace only.
    #[error("Review text must not be empty")]
    EmptyText,

    /// Review text exceeds the maximum length.
    #[error("Review text is {len} characters, maximum is {max}")]
    TextTooLong {
        /// Length of the submitted text in characters.
        len: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// An identifier that must reference an existing row is not positive.
    #[error("Invalid {field}: {value}")]
    InvalidId {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: i64,
    },

    /// Recipe name is empty or whitespace only.
    #[error("Recipe name must not be empty")]
    EmptyName,

    /// More images than a recipe can hold.
    #[error("A recipe holds at most {max} images, got {count}")]
    TooManyImages {
        /// Number of images submitted.
        count: usize,
        /// Maximum accepted.
        max: usize,
    },

    /// Page numbers start at 1.
    #[error("Page must be at least 1, got {0}")]
    InvalidPage(u32),

    /// Page size outside `1..=max`.
    #[error("Page size must be between 1 and {max}, got {size}")]
    InvalidPageSize {
        /// The rejected page size.
        size: u32,
        /// Maximum accepted page size.
        max: u32,
    },

    /// A required request field is missing.
    #[error("Missing field: {0}")]
    MissingField(String),
}
