//! Reviews and the per-recipe aggregate derived from them.

use crate::error::ValidationError;
use crate::ids::{RecipeId, ReviewId, UserId};
use serde::{Deserialize, Serialize};

/// Lowest accepted rating.
pub const MIN_RATING: i32 = 1;

/// Highest accepted rating.
pub const MAX_RATING: i32 = 5;

/// Maximum review text length, in characters.
pub const MAX_REVIEW_TEXT_LEN: usize = 2000;

/// A stored review. Immutable once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Storage-assigned id.
    pub id: ReviewId,
    /// Free-form review body.
    pub text: String,
    /// Rating in `1..=5`.
    pub rating_value: i32,
    /// Recipe the review belongs to.
    pub recipe_id: RecipeId,
    /// Author of the review.
    pub author_id: UserId,
}

/// A review that has been submitted but not yet written.
///
/// This is the payload carried through the ingestion queue. Call
/// [`NewReview::validate`] before enqueuing; the worker trusts it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReview {
    /// Free-form review body.
    pub text: String,
    /// Rating in `1..=5`.
    pub rating_value: i32,
    /// Recipe being reviewed.
    pub recipe_id: RecipeId,
    /// Author of the review.
    pub author_id: UserId,
}

impl NewReview {
    /// Build a review request.
    #[must_use]
    pub fn new(
        recipe_id: RecipeId,
        author_id: UserId,
        rating_value: i32,
        text: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            rating_value,
            recipe_id,
            author_id,
        }
    }

    /// Check the payload is well formed.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] describing the first problem found:
    /// rating out of range, empty or oversized text, or a non-positive id.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating_value) {
            return Err(ValidationError::RatingOutOfRange {
                value: self.rating_value,
                min: MIN_RATING,
                max: MAX_RATING,
            });
        }
        if self.text.trim().is_empty() {
            return Err(ValidationError::EmptyText);
        }
        let len = self.text.chars().count();
        if len > MAX_REVIEW_TEXT_LEN {
            return Err(ValidationError::TextTooLong {
                len,
                max: MAX_REVIEW_TEXT_LEN,
            });
        }
        if !self.recipe_id.is_valid() {
            return Err(ValidationError::InvalidId {
                field: "recipe_id",
                value: self.recipe_id.get(),
            });
        }
        if !self.author_id.is_valid() {
            return Err(ValidationError::InvalidId {
                field: "author_id",
                value: self.author_id.get(),
            });
        }
        Ok(())
    }
}

/// Derived review statistics stored on the recipe row.
///
/// Always recomputed from the full set of reviews, never patched
/// incrementally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeAggregate {
    /// Number of reviews for the recipe.
    pub review_count: u32,
    /// Arithmetic mean of the ratings, `0.0` when there are none.
    pub avg_rating: f64,
}

impl RecipeAggregate {
    /// Compute count and mean from a set of ratings.
    #[must_use]
    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = i32>,
    {
        let (count, sum) = ratings
            .into_iter()
            .fold((0u32, 0i64), |(count, sum), rating| {
                (count + 1, sum + i64::from(rating))
            });

        let avg_rating = if count == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let sum = sum as f64;
            sum / f64::from(count)
        };

        Self {
            review_count: count,
            avg_rating,
        }
    }
}
