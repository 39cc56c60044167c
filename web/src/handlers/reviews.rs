//! Review submission.

use crate::handlers::recipes::recipe_id;
use crate::state::AppState;
use crate::WebResult;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use recipe_catalog_core::{NewReview, UserId};
use serde::{Deserialize, Serialize};

/// Body of `POST /recipes/:id/reviews`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    /// Review body
    #[serde(alias = "review_text")]
    pub text: String,
    /// Rating in `1..=5`
    #[serde(alias = "rating")]
    pub rating_value: i32,
    /// Reviewing user
    #[serde(alias = "authorID")]
    pub author_id: i64,
}

/// Acknowledgement for a queued review.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewAccepted {
    /// Always `"accepted"`
    pub status: &'static str,
    /// Recipe the review was queued for
    pub recipe_id: i64,
}

/// `POST /recipes/:id/reviews`
///
/// Answers `202 Accepted` once the review is on the queue. The insert and
/// the aggregate refresh happen later on the aggregation worker; a failure
/// there is logged and counted, never reported back here.
pub async fn submit_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ReviewRequest>,
) -> WebResult<(StatusCode, Json<ReviewAccepted>)> {
    let recipe = recipe_id(id)?;
    let review = NewReview::new(recipe, UserId::new(body.author_id), body.rating_value, body.text);

    state.catalog.submit_review(review).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ReviewAccepted {
            status: "accepted",
            recipe_id: recipe.get(),
        }),
    ))
}
