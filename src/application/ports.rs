use async_trait::async_trait;
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::{detection::Detection, errors::DomainResult, model::*};

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    /// Resolves the weights file to load for `model`.
    async fn locate(&self, model: &ModelId) -> DomainResult<PathBuf>;
}

/// Blocking; callers run it off the async executor.
pub trait DetectorLoaderPort: Send + Sync {
    fn load(&self, weights: &Path, params: &YoloParams) -> DomainResult<Arc<dyn DetectorPort>>;
}

/// A loaded model ready for inference. Blocking, like the loader.
pub trait DetectorPort: Send + Sync {
    fn detect(&self, image: &RgbImage, params: &YoloParams) -> DomainResult<Vec<Detection>>;
}
