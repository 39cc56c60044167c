//! In-memory search index.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use recipe_catalog_core::search::SearchFuture;
use recipe_catalog_core::{
    Recipe, RecipeAggregate, RecipeId, SearchDocument, SearchError, SearchIndex,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Search index backed by a map of documents.
///
/// Matching is a case-insensitive substring test over name, description,
/// ingredients and steps; filters match on any shared tag.
#[derive(Clone, Debug, Default)]
pub struct InMemorySearchIndex {
    docs: Arc<RwLock<BTreeMap<String, SearchDocument>>>,
    failing: Arc<AtomicBool>,
    collection_ready: Arc<AtomicBool>,
}

impl InMemorySearchIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with a 503 until switched off.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// The indexed document for a recipe.
    #[must_use]
    pub fn document(&self, id: RecipeId) -> Option<SearchDocument> {
        self.docs.read().unwrap().get(&id.to_string()).cloned()
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.read().unwrap().len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.read().unwrap().is_empty()
    }

    /// Whether `ensure_collection` has been called.
    #[must_use]
    pub fn collection_ready(&self) -> bool {
        self.collection_ready.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), SearchError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(SearchError::Status {
                status: 503,
                body: "injected search failure".to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn matching<F>(&self, keep: F) -> Vec<SearchDocument>
    where
        F: Fn(&SearchDocument) -> bool,
    {
        self.docs
            .read()
            .unwrap()
            .values()
            .filter(|d| keep(d))
            .cloned()
            .collect()
    }
}

impl SearchIndex for InMemorySearchIndex {
    fn ensure_collection(&self) -> SearchFuture<'_, ()> {
        Box::pin(async move {
            self.check()?;
            self.collection_ready.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    fn index_recipe<'a>(&'a self, recipe: &'a Recipe) -> SearchFuture<'a, ()> {
        Box::pin(async move {
            self.check()?;
            let doc = SearchDocument::try_from(recipe)?;
            self.docs.write().unwrap().insert(doc.id.clone(), doc);
            Ok(())
        })
    }

    fn update_aggregate(
        &self,
        recipe_id: RecipeId,
        aggregate: RecipeAggregate,
    ) -> SearchFuture<'_, ()> {
        Box::pin(async move {
            self.check()?;
            let mut docs = self.docs.write().unwrap();
            let doc = docs
                .get_mut(&recipe_id.to_string())
                .ok_or_else(|| SearchError::Status {
                    status: 404,
                    body: format!("document {recipe_id} not found"),
                })?;
            doc.review_count = aggregate.review_count;
            doc.avg_rating = aggregate.avg_rating;
            Ok(())
        })
    }

    fn search<'a>(&'a self, query: &'a str) -> SearchFuture<'a, Vec<SearchDocument>> {
        Box::pin(async move {
            self.check()?;
            let needle = query.trim().to_lowercase();
            if needle.is_empty() || needle == "*" {
                return Ok(self.matching(|_| true));
            }
            Ok(self.matching(|d| {
                [&d.name, &d.descr, &d.ingredients, &d.steps]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }))
        })
    }

    fn filter<'a>(&'a self, filters: &'a [String]) -> SearchFuture<'a, Vec<SearchDocument>> {
        Box::pin(async move {
            self.check()?;
            Ok(self.matching(|d| d.filters.iter().any(|f| filters.contains(f))))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::new_recipe;
    use recipe_catalog_core::UserId;

    #[tokio::test]
    async fn search_matches_ingredients_case_insensitively() {
        let index = InMemorySearchIndex::new();
        let mut new = new_recipe("Soup", UserId::new(1));
        new.ingredients.insert("Beetroot".to_string(), "2".to_string());
        let recipe = new.into_recipe(RecipeId::new(1), crate::fixtures::test_time());
        index.index_recipe(&recipe).await.unwrap();

        assert_eq!(index.search("beet").await.unwrap().len(), 1);
        assert!(index.search("lamb").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_of_unknown_document_is_404() {
        let index = InMemorySearchIndex::new();
        let err = index
            .update_aggregate(RecipeId::new(3), RecipeAggregate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Status { status: 404, .. }));
    }
}
