//! Typesense HTTP client

use crate::types::{
    AggregatePatch, CollectionSchema, DEFAULT_COLLECTION, QUERY_BY, SearchResponse,
    filter_expression,
};
use recipe_catalog_core::{
    Recipe, RecipeAggregate, RecipeId, SearchDocument, SearchError, SearchFuture, SearchIndex,
};
use reqwest::{Client, Response, StatusCode};

const API_KEY_HEADER: &str = "X-TYPESENSE-API-KEY";

/// Connection settings for [`TypesenseIndex`]
#[derive(Debug, Clone)]
pub struct TypesenseConfig {
    /// Base URL, e.g. `http://localhost:8108`
    pub url: String,
    /// Admin API key
    pub api_key: String,
    /// Collection holding recipe documents
    pub collection: String,
}

impl TypesenseConfig {
    /// Settings for the default `recipes` collection
    #[must_use]
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }

    /// Use a different collection name
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }
}

/// [`SearchIndex`] backed by a Typesense server
#[derive(Clone)]
pub struct TypesenseIndex {
    client: Client,
    config: TypesenseConfig,
}

impl TypesenseIndex {
    /// Create a client with a fresh connection pool
    #[must_use]
    pub fn new(config: TypesenseConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Create a client sharing an existing `reqwest` pool
    #[must_use]
    pub const fn with_client(client: Client, config: TypesenseConfig) -> Self {
        Self { client, config }
    }

    /// Collection this client writes to
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.config.collection
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.config.url, self.config.collection)
    }

    fn documents_url(&self) -> String {
        format!("{}/documents", self.collection_url())
    }

    async fn create_if_missing(&self) -> Result<(), SearchError> {
        let response = self
            .client
            .get(self.collection_url())
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            StatusCode::OK => return Ok(()),
            StatusCode::NOT_FOUND => {}
            _ => return Err(status_error(response).await),
        }

        let response = self
            .client
            .post(format!("{}/collections", self.config.url))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&CollectionSchema::recipes(self.config.collection.clone()))
            .send()
            .await
            .map_err(transport)?;

        // 409: created concurrently by another instance.
        if response.status().is_success() || response.status() == StatusCode::CONFLICT {
            tracing::info!(collection = %self.config.collection, "Search collection created");
            Ok(())
        } else {
            Err(status_error(response).await)
        }
    }

    async fn upsert(&self, recipe: &Recipe) -> Result<(), SearchError> {
        let document = SearchDocument::try_from(recipe)?;
        let response = self
            .client
            .post(self.documents_url())
            .header(API_KEY_HEADER, &self.config.api_key)
            .query(&[("action", "upsert")])
            .json(&document)
            .send()
            .await
            .map_err(transport)?;

        check(response).await?;
        tracing::debug!(recipe_id = %recipe.id, "Recipe indexed");
        Ok(())
    }

    async fn patch_aggregate(
        &self,
        recipe_id: RecipeId,
        aggregate: RecipeAggregate,
    ) -> Result<(), SearchError> {
        let response = self
            .client
            .patch(format!("{}/{recipe_id}", self.documents_url()))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&AggregatePatch::from(aggregate))
            .send()
            .await
            .map_err(transport)?;

        check(response).await
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<Vec<SearchDocument>, SearchError> {
        let response = self
            .client
            .get(format!("{}/search", self.documents_url()))
            .header(API_KEY_HEADER, &self.config.api_key)
            .query(params)
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Serialization(e.to_string()))?;
        tracing::debug!(found = body.found, hits = body.hits.len(), "Search answered");
        Ok(body.into_documents())
    }
}

impl SearchIndex for TypesenseIndex {
    fn ensure_collection(&self) -> SearchFuture<'_, ()> {
        Box::pin(self.create_if_missing())
    }

    fn index_recipe<'a>(&'a self, recipe: &'a Recipe) -> SearchFuture<'a, ()> {
        Box::pin(self.upsert(recipe))
    }

    fn update_aggregate(
        &self,
        recipe_id: RecipeId,
        aggregate: RecipeAggregate,
    ) -> SearchFuture<'_, ()> {
        Box::pin(self.patch_aggregate(recipe_id, aggregate))
    }

    fn search<'a>(&'a self, query: &'a str) -> SearchFuture<'a, Vec<SearchDocument>> {
        Box::pin(async move { self.query(&[("q", query), ("query_by", QUERY_BY)]).await })
    }

    fn filter<'a>(&'a self, filters: &'a [String]) -> SearchFuture<'a, Vec<SearchDocument>> {
        Box::pin(async move {
            let filter_by = filter_expression(filters);
            self.query(&[("q", "*"), ("query_by", "filters"), ("filter_by", &filter_by)])
                .await
        })
    }
}

impl std::fmt::Debug for TypesenseIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypesenseIndex")
            .field("url", &self.config.url)
            .field("collection", &self.config.collection)
            .finish_non_exhaustive()
    }
}

#[allow(clippy::needless_pass_by_value)] // Used as a map_err adapter
fn transport(e: reqwest::Error) -> SearchError {
    SearchError::Http(e.to_string())
}

async fn status_error(response: Response) -> SearchError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    SearchError::Status { status, body }
}

async fn check(response: Response) -> Result<(), SearchError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(status_error(response).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_trims_trailing_slash() {
        let config = TypesenseConfig::new("http://localhost:8108/", "key");
        assert_eq!(config.url, "http://localhost:8108");
        assert_eq!(config.collection, "recipes");
    }

    #[test]
    fn urls_include_collection() {
        let index = TypesenseIndex::new(
            TypesenseConfig::new("http://search:8108", "key").with_collection("dishes"),
        );
        assert_eq!(index.collection_url(), "http://search:8108/collections/dishes");
        assert_eq!(
            index.documents_url(),
            "http://search:8108/collections/dishes/documents"
        );
    }

    #[test]
    fn debug_hides_api_key() {
        let index = TypesenseIndex::new(TypesenseConfig::new("http://search:8108", "secret"));
        assert!(!format!("{index:?}").contains("secret"));
    }
}
