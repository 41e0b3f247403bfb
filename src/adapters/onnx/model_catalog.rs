use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::application::ports::ModelCatalogPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::ModelId;

/// Finds weights on the local filesystem.
///
/// A `.pt` path is served by its ONNX export when one sits next to it, so a
/// deployment can keep pointing `YOLO_MODEL` at the training checkpoint.
pub struct OnnxModelCatalog;

impl OnnxModelCatalog {
    pub fn new() -> Self { Self }
}

#[async_trait]
impl ModelCatalogPort for OnnxModelCatalog {
    async fn locate(&self, model: &ModelId) -> DomainResult<PathBuf> {
        if model.path.trim().is_empty() {
            return Err(DomainError::InvalidInput("model path empty".into()));
        }

        let configured = PathBuf::from(&model.path);
        if let Some(export) = onnx_export_of(&configured) {
            if exists(&export).await {
                return Ok(export);
            }
        }
        if !exists(&configured).await {
            return Err(DomainError::NotFound(model.path.clone()));
        }
        Ok(configured)
    }
}

fn onnx_export_of(path: &Path) -> Option<PathBuf> {
    let ext = path.extension()?.to_str()?;
    ext.eq_ignore_ascii_case("pt").then(|| path.with_extension("onnx"))
}

async fn exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
