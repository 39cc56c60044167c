//! Search index queries.

use crate::state::AppState;
use crate::WebResult;
use axum::{
    extract::{Query, State},
    Json,
};
use recipe_catalog_core::SearchDocument;
use serde::Deserialize;

/// `?q=` query.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    /// Free-text query; `*` matches everything
    #[serde(default)]
    pub q: String,
}

/// Body of `POST /search/filter`.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterRequest {
    /// Tags; a recipe matches if it carries any of them
    pub filters: Vec<String>,
}

/// `GET /search?q=`
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> WebResult<Json<Vec<SearchDocument>>> {
    let query = params.q.trim();
    let query = if query.is_empty() { "*" } else { query };
    Ok(Json(state.catalog.search(query).await?))
}

/// `POST /search/filter`
pub async fn filter(
    State(state): State<AppState>,
    Json(body): Json<FilterRequest>,
) -> WebResult<Json<Vec<SearchDocument>>> {
    Ok(Json(state.catalog.filter(&body.filters).await?))
}
