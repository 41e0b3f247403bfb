//! YOLO pre- and post-processing around the raw ONNX session.

use anyhow::{bail, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::{s, Array4, ArrayView2};

use crate::domain::detection::Detection;
use crate::domain::model::{ClassNames, YoloParams};

const PAD_VALUE: f32 = 114.0 / 255.0;

/// Geometry of a letterboxed input, needed to map boxes back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub src_width: u32,
    pub src_height: u32,
}

impl Letterbox {
    /// Maps an xyxy box from model input space onto the source image, clipped
    /// to its bounds.
    pub fn restore(&self, [x1, y1, x2, y2]: [f32; 4]) -> [f32; 4] {
        let w = self.src_width as f32;
        let h = self.src_height as f32;
        let x = |v: f32| ((v - self.pad_x) / self.scale).clamp(0.0, w);
        let y = |v: f32| ((v - self.pad_y) / self.scale).clamp(0.0, h);
        [x(x1), y(y1), x(x2), y(y2)]
    }
}

/// Aspect-preserving resize into a `size`×`size` canvas padded with grey,
/// returned as a normalised NCHW tensor.
pub fn letterbox(rgb: &RgbImage, size: u32) -> (Array4<f32>, Letterbox) {
    let (w, h) = rgb.dimensions();
    let scale = (size as f32 / w as f32).min(size as f32 / h as f32);
    let new_w = ((w as f32 * scale).round() as u32).clamp(1, size);
    let new_h = ((h as f32 * scale).round() as u32).clamp(1, size);
    let pad_x = (size - new_w) / 2;
    let pad_y = (size - new_h) / 2;

    let resized = image::imageops::resize(rgb, new_w, new_h, FilterType::Triangle);

    let side = size as usize;
    let mut input = Array4::<f32>::from_elem((1, 3, side, side), PAD_VALUE);
    for (x, y, pixel) in resized.enumerate_pixels() {
        let px = (x + pad_x) as usize;
        let py = (y + pad_y) as usize;
        input[[0, 0, py, px]] = pixel[0] as f32 / 255.0;
        input[[0, 1, py, px]] = pixel[1] as f32 / 255.0;
        input[[0, 2, py, px]] = pixel[2] as f32 / 255.0;
    }

    let geometry = Letterbox {
        scale,
        pad_x: pad_x as f32,
        pad_y: pad_y as f32,
        src_width: w,
        src_height: h,
    };
    (input, geometry)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputLayout {
    /// `[4 + nc, N]`, the usual YOLOv8/11 export.
    ChannelsFirst,
    /// `[N, 4 + nc]`
    ChannelsLast,
    /// `[N, 6]` of `x1, y1, x2, y2, score, class`, already suppressed.
    EndToEnd,
}

/// `end_to_end` comes from the export metadata when it says so; without it
/// the shape decides, and a 2-class `[N, 6]` raw output reads as end-to-end.
fn layout(rows: usize, cols: usize, end_to_end: Option<bool>) -> Result<OutputLayout> {
    let layout = match end_to_end {
        Some(true) if cols == 6 => return Ok(OutputLayout::EndToEnd),
        Some(true) => bail!("end-to-end export with output shape [{rows}, {cols}], expected [N, 6]"),
        Some(false) => raw_layout(rows, cols),
        None if cols == 6 && rows > cols => OutputLayout::EndToEnd,
        None => raw_layout(rows, cols),
    };
    let channels = if layout == OutputLayout::ChannelsFirst { rows } else { cols };
    if channels < 5 {
        bail!("unsupported detection output shape [{rows}, {cols}]");
    }
    Ok(layout)
}

fn raw_layout(rows: usize, cols: usize) -> OutputLayout {
    if rows < cols {
        OutputLayout::ChannelsFirst
    } else {
        OutputLayout::ChannelsLast
    }
}

/// Turns one image's output tensor (batch axis removed) into detections on
/// the source image, best first.
pub fn decode_output(
    output: ArrayView2<f32>,
    geometry: &Letterbox,
    params: &YoloParams,
    names: &ClassNames,
    end_to_end: Option<bool>,
) -> Result<Vec<Detection>> {
    let (rows, cols) = output.dim();
    if rows == 0 || cols == 0 {
        return Ok(Vec::new());
    }

    let detections = match layout(rows, cols, end_to_end)? {
        OutputLayout::EndToEnd => self::end_to_end(output, geometry, params, names),
        OutputLayout::ChannelsFirst => raw(output.t(), geometry, params, names),
        OutputLayout::ChannelsLast => raw(output, geometry, params, names),
    };
    Ok(detections)
}

fn raw(
    candidates: ArrayView2<f32>,
    geometry: &Letterbox,
    params: &YoloParams,
    names: &ClassNames,
) -> Vec<Detection> {
    let mut detections = Vec::new();
    for row in candidates.outer_iter() {
        let scores = row.slice(s![4..]);
        let Some((class_id, &score)) = scores
            .indexed_iter()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
        else {
            continue;
        };
        if !(score > params.conf_threshold) {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        let det = Detection {
            class_id,
            class_name: names.name(class_id),
            confidence: score.clamp(0.0, 1.0),
            bbox: geometry.restore([cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0]),
        };
        if det.is_well_formed() {
            detections.push(det);
        }
    }
    nms(detections, params.iou_threshold, params.max_detections)
}

fn end_to_end(
    rows: ArrayView2<f32>,
    geometry: &Letterbox,
    params: &YoloParams,
    names: &ClassNames,
) -> Vec<Detection> {
    rows.outer_iter()
        .filter(|row| row[4] > params.conf_threshold)
        .map(|row| {
            let class_id = row[5].max(0.0).round() as usize;
            Detection {
                class_id,
                class_name: names.name(class_id),
                confidence: row[4].clamp(0.0, 1.0),
                bbox: geometry.restore([row[0], row[1], row[2], row[3]]),
            }
        })
        .filter(Detection::is_well_formed)
        .take(params.max_detections)
        .collect()
}

/// Class-aware greedy non-maximum suppression. Output is sorted by
/// descending confidence and holds at most `max_detections` entries.
pub fn nms(mut detections: Vec<Detection>, iou_threshold: f32, max_detections: usize) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::new();
    for det in detections {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == det.class_id && k.iou(&det) > iou_threshold);
        if !suppressed {
            kept.push(det);
        }
    }
    kept
}
