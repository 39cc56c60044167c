//! Fixtures and builders for catalog tests.

use chrono::{DateTime, Utc};
use recipe_catalog_core::{NewRecipe, NewReview, RecipeId, UserId};

/// Fixed timestamp used for every seeded recipe (2025-01-01 00:00:00 UTC).
#[must_use]
pub fn test_time() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default()
}

/// A minimal valid recipe payload.
#[must_use]
pub fn new_recipe(name: &str, author_id: UserId) -> NewRecipe {
    NewRecipe {
        name: name.to_string(),
        description: format!("How to make {name}"),
        difficulty: "easy".to_string(),
        author_id,
        ..NewRecipe::default()
    }
}

/// A valid review with generated text.
#[must_use]
pub fn review(recipe_id: RecipeId, rating_value: i32) -> NewReview {
    NewReview::new(
        recipe_id,
        UserId::new(1),
        rating_value,
        format!("Rated {rating_value}"),
    )
}

/// Install a test-friendly tracing subscriber. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_is_fixed() {
        assert_eq!(test_time(), test_time());
        assert_eq!(test_time().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn fixtures_are_valid() {
        assert!(new_recipe("Plov", UserId::new(1)).validate().is_ok());
        assert!(review(RecipeId::new(1), 5).validate().is_ok());
    }
}
