//! HTTP error responses.
//!
//! Handlers return [`AppError`]; catalog, validation, image and multipart
//! errors convert into it with `?`. The body is always
//! `{"code": "...", "message": "..."}`.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use recipe_catalog_core::{ImageError, RecipeId, ValidationError};
use recipe_catalog_runtime::{CatalogError, IngestError};
use serde::Serialize;
use std::fmt;

/// Error returned by every handler.
///
/// Server errors keep their cause in `source` for the log line; clients only
/// see `code` and `message`.
///
/// ```ignore
/// async fn get_recipe(State(state): State<AppState>, Path(id): Path<i64>) -> WebResult<Json<Recipe>> {
///     // CatalogError::NotFound becomes a 404
///     Ok(Json(state.catalog.get_recipe(recipe_id(id)?).await?))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
    source: Option<anyhow::Error>,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying cause, logged but never sent to the client.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// HTTP status this error renders as.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// 400: a field could not be decoded.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// 404 for a recipe id with no row.
    #[must_use]
    pub fn recipe_not_found(id: RecipeId) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("Recipe {id} not found"),
        )
    }

    /// 422: the request decoded but breaks a domain rule.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    /// 408: the review queue stayed full past the submit timeout.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::REQUEST_TIMEOUT, "TIMEOUT", message)
    }

    /// 500.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            message,
        )
    }

    /// 503: shutting down, or search is not configured.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = self.code,
                message = %self.message,
                error = self.source.as_ref().map(tracing::field::display),
                "Request failed"
            );
        } else {
            tracing::debug!(status = %self.status, code = self.code, message = %self.message, "Request rejected");
        }

        let body = Json(ErrorBody {
            code: self.code,
            message: &self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(e) | CatalogError::Ingest(IngestError::Validation(e)) => {
                e.into()
            }
            CatalogError::NotFound(id) => Self::recipe_not_found(id),
            CatalogError::SearchUnavailable => Self::unavailable("Search is not configured"),
            CatalogError::Ingest(IngestError::ShuttingDown) => {
                Self::unavailable("Review queue is shutting down")
            }
            CatalogError::Ingest(IngestError::SubmitTimeout(after)) => {
                Self::timeout(format!("Review queue full for {}ms", after.as_millis()))
            }
            CatalogError::Storage(e) => Self::internal("Storage failure").with_source(e),
            CatalogError::Search(e) => Self::internal("Search failure").with_source(e),
            CatalogError::Ingest(e) => Self::internal("Review queue failure").with_source(e),
        }
    }
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::InvalidName(name) => Self::bad_request(format!("Invalid file name: {name}")),
            ImageError::Io(e) => Self::internal("Failed to store image").with_source(e),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), "BAD_MULTIPART", err.body_text())
    }
}
