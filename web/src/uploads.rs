//! Local-disk storage for uploaded recipe images.

use recipe_catalog_core::images::sanitize_file_name;
use recipe_catalog_core::{ImageError, ImageStore, UserId};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

/// Writes images to `<root>/<author>/<unix_ts>_<uuid>_<name>`.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    /// Store under `root`, created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn write(
        &self,
        author: UserId,
        original_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ImageError> {
        let name = sanitize_file_name(original_name)
            .ok_or_else(|| ImageError::InvalidName(original_name.to_string()))?;

        let dir = self.root.join(author.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(format!(
            "{}_{}_{name}",
            chrono::Utc::now().timestamp(),
            uuid::Uuid::new_v4().simple()
        ));
        tokio::fs::write(&path, &bytes).await?;

        tracing::debug!(author_id = %author, path = %path.display(), size = bytes.len(), "Image stored");
        Ok(path.to_string_lossy().into_owned())
    }
}

impl ImageStore for LocalImageStore {
    fn save<'a>(
        &'a self,
        author: UserId,
        original_name: &'a str,
        bytes: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<String, ImageError>> + Send + 'a>> {
        Box::pin(self.write(author, original_name, bytes))
    }
}
