use serde::{Deserialize, Serialize};

use crate::domain::detection::Detection;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub model_path: String,
    pub img_size: u32,
    pub conf: f32,
    pub loaded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub ok: bool,
    pub count: usize,
    pub detections: Vec<Detection>,
}

impl From<Vec<Detection>> for PredictResponse {
    fn from(detections: Vec<Detection>) -> Self {
        Self {
            ok: true,
            count: detections.len(),
            detections,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
