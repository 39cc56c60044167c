//! The catalog facade used by the HTTP layer.
//!
//! Wires the ingestion queue, the read fan-out and the optional search index
//! behind one object. Only validation errors and failures of the primary
//! query reach callers; per-recipe review fetch failures and write-side
//! storage failures are absorbed below this layer.

use crate::cancel::CancelToken;
use crate::fanout::{FanoutConfig, ReviewAssembler};
use crate::health::{HealthCheck, HealthReport};
use crate::ingest::{DrainReport, IngestConfig, IngestError, ReviewIngestor};
use crate::worker::CatalogStores;
use recipe_catalog_core::{
    NewRecipe, NewReview, Recipe, RecipeId, RecipeStore, SearchDocument, SearchError,
    SearchIndex, StoreError, UserId, ValidationError,
};
use std::sync::Arc;
use thiserror::Error;

/// Largest page a listing may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when the caller gives none.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Errors surfaced by [`Catalog`] operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// Malformed request.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The requested recipe does not exist.
    #[error("Recipe not found: {0}")]
    NotFound(RecipeId),

    /// The primary storage query failed.
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// The search index failed.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// No search index is configured.
    #[error("Search is not available")]
    SearchUnavailable,

    /// The ingestion queue refused the review.
    #[error(transparent)]
    Ingest(IngestError),
}

impl From<IngestError> for CatalogError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Validation(e) => Self::Validation(e),
            other => Self::Ingest(other),
        }
    }
}

/// Settings for the write queue and the read fan-out.
#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    /// Ingestion queue settings.
    pub ingest: IngestConfig,
    /// Read fan-out settings.
    pub fanout: FanoutConfig,
}

/// Recipe catalog: review ingestion plus assembled reads.
pub struct Catalog {
    recipes: Arc<dyn RecipeStore>,
    search: Option<Arc<dyn SearchIndex>>,
    ingestor: ReviewIngestor,
    assembler: ReviewAssembler,
    reads: CancelToken,
}

impl Catalog {
    /// Build the catalog and start its aggregation worker.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(stores: CatalogStores, config: CatalogConfig) -> Self {
        let assembler = ReviewAssembler::new(Arc::clone(&stores.reviews), config.fanout);
        let recipes = Arc::clone(&stores.recipes);
        let search = stores.search.clone();
        let ingestor = ReviewIngestor::start(stores, config.ingest);

        Self {
            recipes,
            search,
            ingestor,
            assembler,
            reads: CancelToken::new(),
        }
    }

    /// Queue a review. Returns once it is accepted onto the queue.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Validation`] for a malformed review, or
    /// [`CatalogError::Ingest`] if the queue is shutting down or the submit
    /// timed out.
    #[tracing::instrument(skip(self, review), fields(recipe_id = %review.recipe_id))]
    pub async fn submit_review(&self, review: NewReview) -> Result<(), CatalogError> {
        self.ingestor.submit(review).await?;
        Ok(())
    }

    /// One page of recipes, newest first, each with its reviews attached.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Validation`] for an out-of-range page or page size,
    /// [`CatalogError::Storage`] if the recipe query fails.
    #[tracing::instrument(skip(self))]
    pub async fn list_recipes(&self, page: u32, page_size: u32) -> Result<Vec<Recipe>, CatalogError> {
        validate_page(page, page_size)?;
        let recipes = self.recipes.select_recipes_page(page, page_size).await?;
        Ok(self.assembler.assemble(recipes, &self.reads).await)
    }

    /// One recipe with its reviews attached.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] if it does not exist,
    /// [`CatalogError::Storage`] if the recipe query fails.
    #[tracing::instrument(skip(self))]
    pub async fn get_recipe(&self, id: RecipeId) -> Result<Recipe, CatalogError> {
        let recipe = self
            .recipes
            .select_recipe_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound(id))?;

        self.assembler
            .assemble(vec![recipe], &self.reads)
            .await
            .pop()
            .ok_or(CatalogError::NotFound(id))
    }

    /// Create a recipe and index it.
    ///
    /// Indexing is best effort: a search failure is logged and the stored
    /// recipe is still returned.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Validation`] for a malformed recipe,
    /// [`CatalogError::Storage`] if the insert fails.
    #[tracing::instrument(skip(self, recipe), fields(name = %recipe.name, author_id = %recipe.author_id))]
    pub async fn create_recipe(&self, recipe: NewRecipe) -> Result<Recipe, CatalogError> {
        recipe.validate()?;
        let stored = self.recipes.insert_recipe(&recipe).await?;
        tracing::info!(recipe_id = %stored.id, "Recipe created");

        if let Some(search) = &self.search {
            if let Err(e) = search.index_recipe(&stored).await {
                tracing::warn!(recipe_id = %stored.id, error = %e, "Failed to index new recipe");
            }
        }

        Ok(stored)
    }

    /// One page of an author's recipes with reviews attached.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Validation`] for a bad page or author id,
    /// [`CatalogError::Storage`] if the recipe query fails.
    #[tracing::instrument(skip(self))]
    pub async fn recipes_by_author(
        &self,
        author_id: UserId,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Recipe>, CatalogError> {
        if !author_id.is_valid() {
            return Err(ValidationError::InvalidId {
                field: "author_id",
                value: author_id.get(),
            }
            .into());
        }
        validate_page(page, page_size)?;
        let recipes = self
            .recipes
            .select_recipes_by_author(author_id, page, page_size)
            .await?;
        Ok(self.assembler.assemble(recipes, &self.reads).await)
    }

    /// Free-text search.
    ///
    /// # Errors
    ///
    /// [`CatalogError::SearchUnavailable`] without an index,
    /// [`CatalogError::Search`] if the query fails.
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<SearchDocument>, CatalogError> {
        let index = self.search.as_ref().ok_or(CatalogError::SearchUnavailable)?;
        Ok(index.search(query).await?)
    }

    /// Recipes tagged with any of `filters`.
    ///
    /// # Errors
    ///
    /// [`CatalogError::SearchUnavailable`] without an index,
    /// [`CatalogError::Search`] if the query fails.
    #[tracing::instrument(skip(self))]
    pub async fn filter(&self, filters: &[String]) -> Result<Vec<SearchDocument>, CatalogError> {
        let index = self.search.as_ref().ok_or(CatalogError::SearchUnavailable)?;
        if filters.is_empty() {
            return Ok(Vec::new());
        }
        Ok(index.filter(filters).await?)
    }

    /// Push every stored recipe to the search index. Returns how many were
    /// indexed.
    ///
    /// # Errors
    ///
    /// [`CatalogError::SearchUnavailable`] without an index,
    /// [`CatalogError::Storage`] if a page query fails,
    /// [`CatalogError::Search`] on the first indexing failure.
    #[tracing::instrument(skip(self))]
    pub async fn reindex_all(&self) -> Result<usize, CatalogError> {
        let index = self.search.as_ref().ok_or(CatalogError::SearchUnavailable)?;
        index.ensure_collection().await?;

        let mut indexed = 0;
        let mut page = 1;
        loop {
            let recipes = self.recipes.select_recipes_page(page, MAX_PAGE_SIZE).await?;
            let fetched = recipes.len();
            for recipe in &recipes {
                index.index_recipe(recipe).await?;
            }
            indexed += fetched;
            if fetched < MAX_PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }

        tracing::info!(indexed, "Search index rebuilt");
        Ok(indexed)
    }

    /// Readiness of the review queue and the search index.
    #[must_use]
    pub fn health(&self) -> HealthReport {
        HealthReport::new(vec![self.ingestor.health(), self.search_health()])
    }

    fn search_health(&self) -> HealthCheck {
        if self.search.is_some() {
            HealthCheck::healthy("search")
        } else {
            HealthCheck::degraded("search", "No search index configured")
        }
    }

    /// The review ingestion queue.
    #[must_use]
    pub const fn ingestor(&self) -> &ReviewIngestor {
        &self.ingestor
    }

    /// Drain the review queue, then cancel any read still fetching.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Ingest`] if the drain timed out or the worker
    /// panicked.
    pub async fn shutdown(&self) -> Result<DrainReport, CatalogError> {
        let report = self.ingestor.shutdown().await;
        self.reads.cancel();
        report.map_err(CatalogError::from)
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("ingestor", &self.ingestor)
            .field("assembler", &self.assembler)
            .field("search", &self.search.is_some())
            .finish_non_exhaustive()
    }
}

fn validate_page(page: u32, page_size: u32) -> Result<(), ValidationError> {
    if page < 1 {
        return Err(ValidationError::InvalidPage(page));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(ValidationError::InvalidPageSize {
            size: page_size,
            max: MAX_PAGE_SIZE,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds() {
        assert!(validate_page(1, 1).is_ok());
        assert!(validate_page(7, MAX_PAGE_SIZE).is_ok());
        assert_eq!(validate_page(0, 10), Err(ValidationError::InvalidPage(0)));
        assert!(matches!(
            validate_page(1, 0),
            Err(ValidationError::InvalidPageSize { size: 0, .. })
        ));
        assert!(matches!(
            validate_page(1, MAX_PAGE_SIZE + 1),
            Err(ValidationError::InvalidPageSize { .. })
        ));
    }

    #[test]
    fn ingest_validation_maps_to_catalog_validation() {
        let err = CatalogError::from(IngestError::Validation(ValidationError::EmptyText));
        assert_eq!(err, CatalogError::Validation(ValidationError::EmptyText));

        let err = CatalogError::from(IngestError::ShuttingDown);
        assert_eq!(err, CatalogError::Ingest(IngestError::ShuttingDown));
    }
}
