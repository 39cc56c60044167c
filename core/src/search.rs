//! Search index capability.
//!
//! The index receives full recipe documents on create and fresh aggregates
//! after every review write. It is a secondary view: nothing in the catalog
//! reads it back to decide what is stored.

use crate::ids::RecipeId;
use crate::recipe::Recipe;
use crate::review::RecipeAggregate;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by [`SearchIndex`].
pub type SearchFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SearchError>> + Send + 'a>>;

/// Errors talking to the search index.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// Transport failure (connect, timeout, TLS).
    #[error("Search request failed: {0}")]
    Http(String),

    /// The index answered with a non-success status.
    #[error("Search index returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// Document could not be encoded or a response could not be decoded.
    #[error("Search serialization error: {0}")]
    Serialization(String),
}

/// Flattened form of a recipe as stored in the index.
///
/// Map-valued fields are JSON-encoded into strings because the index schema
/// only knows scalar and string-array fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    /// Recipe id as a string.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub descr: String,
    /// Difficulty label.
    pub diff: String,
    /// Filter tags.
    pub filters: Vec<String>,
    /// JSON-encoded image map.
    pub imgs: String,
    /// Author id as a string.
    pub authorid: String,
    /// JSON-encoded ingredient map.
    pub ingredients: String,
    /// JSON-encoded step map.
    pub steps: String,
    /// Number of reviews.
    pub review_count: u32,
    /// Mean rating.
    pub avg_rating: f64,
}

impl TryFrom<&Recipe> for SearchDocument {
    type Error = SearchError;

    fn try_from(recipe: &Recipe) -> Result<Self, Self::Error> {
        let encode = |value: &std::collections::BTreeMap<String, String>| {
            serde_json::to_string(value).map_err(|e| SearchError::Serialization(e.to_string()))
        };

        Ok(Self {
            id: recipe.id.to_string(),
            name: recipe.name.clone(),
            descr: recipe.description.clone(),
            diff: recipe.difficulty.clone(),
            filters: recipe.filters.clone(),
            imgs: encode(&recipe.images)?,
            authorid: recipe.author_id.to_string(),
            ingredients: encode(&recipe.ingredients)?,
            steps: encode(&recipe.steps)?,
            review_count: recipe.review_count,
            avg_rating: recipe.avg_rating,
        })
    }
}

/// External full-text index over recipes.
pub trait SearchIndex: Send + Sync {
    /// Create the collection if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the index is unreachable or rejects the schema.
    fn ensure_collection(&self) -> SearchFuture<'_, ()>;

    /// Insert or replace the full document for a recipe.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the document cannot be encoded or stored.
    fn index_recipe<'a>(&'a self, recipe: &'a Recipe) -> SearchFuture<'a, ()>;

    /// Patch the aggregate fields of an indexed recipe.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the update fails.
    fn update_aggregate(
        &self,
        recipe_id: RecipeId,
        aggregate: RecipeAggregate,
    ) -> SearchFuture<'_, ()>;

    /// Free-text search over names, descriptions, ingredients and steps.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the query fails.
    fn search<'a>(&'a self, query: &'a str) -> SearchFuture<'a, Vec<SearchDocument>>;

    /// Recipes tagged with any of the given filters.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the query fails.
    fn filter<'a>(&'a self, filters: &'a [String]) -> SearchFuture<'a, Vec<SearchDocument>>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ids::UserId;
    use crate::recipe::NewRecipe;
    use chrono::Utc;

    #[test]
    fn document_flattens_maps_to_json_strings() {
        let mut new = NewRecipe {
            name: "Borscht".to_string(),
            description: "Beet soup".to_string(),
            difficulty: "medium".to_string(),
            filters: vec!["soup".to_string()],
            author_id: UserId::new(4),
            ..NewRecipe::default()
        };
        new.ingredients.insert("beet".to_string(), "2".to_string());
        let mut recipe = new.into_recipe(RecipeId::new(12), Utc::now());
        recipe.set_aggregate(RecipeAggregate::from_ratings([4, 5]));

        let doc = SearchDocument::try_from(&recipe).unwrap();

        assert_eq!(doc.id, "12");
        assert_eq!(doc.authorid, "4");
        assert_eq!(doc.ingredients, r#"{"beet":"2"}"#);
        assert_eq!(doc.imgs, "{}");
        assert_eq!(doc.review_count, 2);
        assert!((doc.avg_rating - 4.5).abs() < 1e-9);
    }

    #[test]
    fn status_error_display() {
        let err = SearchError::Status {
            status: 404,
            body: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "Search index returned 404: Not Found");
    }
}
