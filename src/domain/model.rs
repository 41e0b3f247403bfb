use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelId {
    pub name: String, // file stem, e.g. "best"
    pub path: String, // as configured
}

impl ModelId {
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = Path::new(&path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        Self { name, path }
    }
}

/// Largest downsampling factor of the YOLO backbone.
pub const MODEL_STRIDE: u32 = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoloParams {
    pub input_size: u32,        // 640 typical
    pub conf_threshold: f32,    // 0..1
    pub iou_threshold: f32,     // 0..1
    pub max_detections: usize,  // e.g. 300
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
        }
    }
}

impl YoloParams {
    /// Letterbox side actually fed to a dynamic-shape model: `input_size`
    /// rounded up to a multiple of [`MODEL_STRIDE`].
    pub fn inference_size(&self) -> u32 {
        self.input_size.div_ceil(MODEL_STRIDE).max(1) * MODEL_STRIDE
    }
}

/// Index to label mapping shipped with the weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassNames(HashMap<usize, String>);

impl ClassNames {
    pub fn new(names: HashMap<usize, String>) -> Self {
        Self(names)
    }

    /// Label for `class_id`, or the id itself when the model carries no name.
    pub fn name(&self, class_id: usize) -> String {
        self.0
            .get(&class_id)
            .cloned()
            .unwrap_or_else(|| class_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_name_is_file_stem() {
        assert_eq!(ModelId::from_path("/models/best.pt").name, "best");
    }

    #[test]
    fn inference_size_rounds_up_to_stride() {
        let size = |input_size| YoloParams { input_size, ..YoloParams::default() }.inference_size();
        assert_eq!(size(640), 640);
        assert_eq!(size(650), 672);
        assert_eq!(size(1), 32);
    }

    #[test]
    fn unknown_class_falls_back_to_index() {
        let names = ClassNames::new(HashMap::from([(0, "person".to_string())]));
        assert_eq!(names.name(0), "person");
        assert_eq!(names.name(7), "7");
    }
}
