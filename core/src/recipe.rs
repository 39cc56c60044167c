//! Recipes as read from and written to the catalog.

use crate::error::ValidationError;
use crate::ids::{RecipeId, UserId};
use crate::review::{RecipeAggregate, Review};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum number of images attached to one recipe.
pub const MAX_RECIPE_IMAGES: usize = 3;

/// A recipe together with its stored aggregate.
///
/// `reviews` is never persisted through the recipe row. It is empty when a
/// recipe comes out of storage and is filled in by the read fan-out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Storage-assigned id.
    pub id: RecipeId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Difficulty label, e.g. `"easy"`.
    pub difficulty: String,
    /// Tags used by the filter search.
    #[serde(default)]
    pub filters: Vec<String>,
    /// Image slot label to stored path.
    #[serde(default)]
    pub images: BTreeMap<String, String>,
    /// Ingredient name to quantity.
    #[serde(default)]
    pub ingredients: BTreeMap<String, String>,
    /// Step number to instruction.
    #[serde(default)]
    pub steps: BTreeMap<String, String>,
    /// Author of the recipe.
    pub author_id: UserId,
    /// Author's display name, when joined from `users`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    /// Number of stored reviews.
    pub review_count: u32,
    /// Mean rating, `0.0` when there are no reviews.
    pub avg_rating: f64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Reviews attached at read time.
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl Recipe {
    /// The stored aggregate as a value.
    #[must_use]
    pub const fn aggregate(&self) -> RecipeAggregate {
        RecipeAggregate {
            review_count: self.review_count,
            avg_rating: self.avg_rating,
        }
    }

    /// Overwrite the stored aggregate.
    pub const fn set_aggregate(&mut self, aggregate: RecipeAggregate) {
        self.review_count = aggregate.review_count;
        self.avg_rating = aggregate.avg_rating;
    }
}

/// Payload for creating a recipe.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecipe {
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Difficulty label.
    #[serde(default)]
    pub difficulty: String,
    /// Tags used by the filter search.
    #[serde(default)]
    pub filters: Vec<String>,
    /// Image slot label to stored path.
    #[serde(default)]
    pub images: BTreeMap<String, String>,
    /// Ingredient name to quantity.
    #[serde(default)]
    pub ingredients: BTreeMap<String, String>,
    /// Step number to instruction.
    #[serde(default)]
    pub steps: BTreeMap<String, String>,
    /// Author of the recipe.
    pub author_id: UserId,
}

impl NewRecipe {
    /// Check the payload is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyName`] for a blank name,
    /// [`ValidationError::TooManyImages`] past [`MAX_RECIPE_IMAGES`], and
    /// [`ValidationError::InvalidId`] for a non-positive author.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.images.len() > MAX_RECIPE_IMAGES {
            return Err(ValidationError::TooManyImages {
                count: self.images.len(),
                max: MAX_RECIPE_IMAGES,
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

    /// Turn the payload into a stored recipe with a fresh aggregate.
    #[must_use]
    pub fn into_recipe(self, id: RecipeId, created_at: DateTime<Utc>) -> Recipe {
        Recipe {
            id,
            name: self.name,
            description: self.description,
            difficulty: self.difficulty,
            filters: self.filters,
            images: self.images,
            ingredients: self.ingredients,
            steps: self.steps,
            author_id: self.author_id,
            author_name: None,
            review_count: 0,
            avg_rating: 0.0,
            created_at,
            reviews: Vec::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_recipe() -> NewRecipe {
        NewRecipe {
            name: "Plov".to_string(),
            author_id: UserId::new(3),
            ..NewRecipe::default()
        }
    }

    #[test]
    fn valid_recipe_passes() {
        assert_eq!(new_recipe().validate(), Ok(()));
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut r = new_recipe();
        r.name = " ".to_string();
        assert_eq!(r.validate(), Err(ValidationError::EmptyName));
    }

    #[test]
    fn fourth_image_is_rejected() {
        let mut r = new_recipe();
        for slot in 1..=4 {
            r.images.insert(slot.to_string(), format!("uploads/{slot}.png"));
        }
        assert_eq!(
            r.validate(),
            Err(ValidationError::TooManyImages { count: 4, max: 3 })
        );
    }

    #[test]
    fn into_recipe_starts_with_empty_aggregate() {
        let recipe = new_recipe().into_recipe(RecipeId::new(9), Utc::now());
        assert_eq!(recipe.id, RecipeId::new(9));
        assert_eq!(recipe.aggregate(), RecipeAggregate::default());
        assert!(recipe.reviews.is_empty());
    }

    #[test]
    fn recipe_json_omits_missing_author_name() {
        let recipe = new_recipe().into_recipe(RecipeId::new(1), Utc::now());
        let json = serde_json::to_value(&recipe).unwrap();
        assert!(json.get("author_name").is_none());
        assert_eq!(json["id"], 1);
    }
}
