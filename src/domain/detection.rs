use serde::{Deserialize, Serialize};

/// One predicted object instance, in pixel coordinates of the uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: usize,
    pub class_name: String,
    pub confidence: f32,
    /// `[x1, y1, x2, y2]`, top-left then bottom-right corner.
    pub bbox: [f32; 4],
}

impl Detection {
    pub fn width(&self) -> f32 {
        self.bbox[2] - self.bbox[0]
    }

    pub fn height(&self) -> f32 {
        self.bbox[3] - self.bbox[1]
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Intersection over union of two boxes; 0 when either is degenerate.
    pub fn iou(&self, other: &Detection) -> f32 {
        let ix1 = self.bbox[0].max(other.bbox[0]);
        let iy1 = self.bbox[1].max(other.bbox[1]);
        let ix2 = self.bbox[2].min(other.bbox[2]);
        let iy2 = self.bbox[3].min(other.bbox[3]);

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        inter / union
    }

    /// Confidence in [0, 1] and a box with positive width and height.
    pub fn is_well_formed(&self) -> bool {
        (0.0..=1.0).contains(&self.confidence)
            && self.bbox[0] < self.bbox[2]
            && self.bbox[1] < self.bbox[3]
    }
}
