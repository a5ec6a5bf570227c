use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::image::DecodedImage;
use crate::domain::ports::ImageStore;

/// Directory under the media root holding recipe images.
const IMAGE_DIR: &str = "recipes/images";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("invalid media path '{0}'")]
    InvalidPath(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<MediaError> for DomainError {
    fn from(e: MediaError) -> Self {
        DomainError::media(e.to_string())
    }
}

/// Stores images as files under `root`, served at `url_prefix`.
#[derive(Debug, Clone)]
pub struct FsImageStore {
    root: PathBuf,
    url_prefix: String,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a stored relative path; rejects paths escaping the root.
    fn locate(&self, relative: &str) -> Result<PathBuf, MediaError> {
        let rel = Path::new(relative);
        if relative.is_empty() || !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(MediaError::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(rel))
    }

    async fn write(&self, image: DecodedImage) -> Result<String, MediaError> {
        let relative = format!("{IMAGE_DIR}/{}.{}", Uuid::new_v4().simple(), image.extension);
        let path = self.locate(&relative)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| MediaError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&path, &image.bytes)
            .await
            .map_err(|source| MediaError::Io {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), bytes = image.bytes.len(), "Image stored");
        Ok(relative)
    }

    async fn delete(&self, relative: &str) -> Result<(), MediaError> {
        let path = self.locate(relative)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(MediaError::Io { path, source }),
        }
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    #[instrument(name = "recipes.media.save", skip_all, fields(ext = image.extension))]
    async fn save(&self, image: DecodedImage) -> Result<String, DomainError> {
        Ok(self.write(image).await?)
    }

    #[instrument(name = "recipes.media.remove", skip(self))]
    async fn remove(&self, path: &str) -> Result<(), DomainError> {
        Ok(self.delete(path).await?)
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.url_prefix, path)
    }
}
