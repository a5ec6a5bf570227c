use async_trait::async_trait;

use crate::domain::error::DomainError;
use crate::domain::image::DecodedImage;

/// Storage for uploaded recipe images. Paths are relative to the media root.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist the image under a fresh unique name and return its relative path.
    async fn save(&self, image: DecodedImage) -> Result<String, DomainError>;
    /// Remove a previously stored image. Missing files are not an error.
    async fn remove(&self, path: &str) -> Result<(), DomainError>;
    /// Public URL under which `path` is served.
    fn url_for(&self, path: &str) -> String;
}
