//! Route table and shared layers.

use crate::handlers::{health, recipes, reviews, search};
use crate::middleware::track_request;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Largest accepted request body; sized for three recipe images.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Build the HTTP router.
///
/// ```text
/// GET  /health
/// GET  /health/ready
/// GET  /recipes?page=&page_size=
/// POST /recipes
/// GET  /recipes/:id
/// POST /recipes/:id/reviews
/// GET  /authors/:id/recipes
/// GET  /search?q=
/// POST /search/filter
/// ```
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness))
        .route(
            "/recipes",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route("/recipes/:id", get(recipes::get_recipe))
        .route("/recipes/:id/reviews", post(reviews::submit_review))
        .route("/authors/:id/recipes", get(recipes::recipes_by_author))
        .route("/search", get(search::search))
        .route("/search/filter", post(search::filter))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(track_request))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
