//! Storage for uploaded recipe images.

use crate::ids::UserId;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors writing an uploaded image.
#[derive(Error, Debug)]
pub enum ImageError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The client-provided name cannot be used as a file name.
    #[error("Invalid file name: {0}")]
    InvalidName(String),
}

/// Where uploaded images end up.
///
/// Returns the stored path, which is what the recipe's `images` map records.
pub trait ImageStore: Send + Sync {
    /// Persist `bytes` for `author` and return the stored path.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError`] if the name is unusable or the write fails.
    fn save<'a>(
        &'a self,
        author: UserId,
        original_name: &'a str,
        bytes: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<String, ImageError>> + Send + 'a>>;
}

/// Strip directory components and anything outside `[A-Za-z0-9._-]`.
///
/// Returns `None` if nothing usable is left.
#[must_use]
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
