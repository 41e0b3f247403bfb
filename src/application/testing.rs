//! Test doubles standing in for ONNX Runtime and the filesystem.

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{DetectorLoaderPort, DetectorPort, ModelCatalogPort};
use crate::application::services::DetectionService;
use crate::domain::{
    detection::Detection,
    errors::{DomainError, DomainResult},
    model::{ModelId, YoloParams},
};

pub const MODEL_PATH: &str = "/models/best.pt";

pub struct FakeCatalog {
    missing: bool,
}

impl FakeCatalog {
    pub fn present() -> Self {
        Self { missing: false }
    }

    pub fn missing() -> Self {
        Self { missing: true }
    }
}

#[async_trait]
impl ModelCatalogPort for FakeCatalog {
    async fn locate(&self, model: &ModelId) -> DomainResult<PathBuf> {
        if self.missing {
            return Err(DomainError::NotFound(model.path.clone()));
        }
        Ok(PathBuf::from(&model.path))
    }
}

pub struct FakeLoader {
    pub loads: AtomicUsize,
    failures_left: AtomicUsize,
    delay: Duration,
    detections: Vec<Detection>,
}

impl FakeLoader {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            loads: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
            delay: Duration::ZERO,
            detections,
        }
    }

    pub fn failing_first(failures: usize, detections: Vec<Detection>) -> Self {
        Self { failures_left: AtomicUsize::new(failures), ..Self::new(detections) }
    }

    pub fn slow(detections: Vec<Detection>) -> Self {
        Self { delay: Duration::from_millis(50), ..Self::new(detections) }
    }
}

impl DetectorLoaderPort for FakeLoader {
    fn load(&self, _weights: &Path, _params: &YoloParams) -> DomainResult<Arc<dyn DetectorPort>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DomainError::ModelLoad("corrupt weights".into()));
        }
        Ok(Arc::new(FakeDetector(self.detections.clone())))
    }
}

pub struct FakeDetector(Vec<Detection>);

impl DetectorPort for FakeDetector {
    fn detect(&self, _image: &RgbImage, _params: &YoloParams) -> DomainResult<Vec<Detection>> {
        Ok(self.0.clone())
    }
}

pub fn service_with(
    catalog: FakeCatalog,
    loader: FakeLoader,
) -> (DetectionService, Arc<FakeLoader>) {
    let loader = Arc::new(loader);
    let service = DetectionService::new(
        ModelId::from_path(MODEL_PATH),
        YoloParams::default(),
        Arc::new(catalog),
        loader.clone(),
    );
    (service, loader)
}

pub fn detection(class_id: usize, name: &str, confidence: f32, bbox: [f32; 4]) -> Detection {
    Detection {
        class_id,
        class_name: name.to_string(),
        confidence,
        bbox,
    }
}

/// A solid-colour image encoded in `format`.
pub fn encode_solid(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([40, 120, 200]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format)
        .expect("encoding an in-memory image");
    buf.into_inner()
}
