use anyhow::{anyhow, bail, Result};
use image::RgbImage;
use ndarray::{ArrayViewD, Axis, Ix2, IxDyn};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::adapters::onnx::metadata::{parse_class_names, parse_end_to_end};
use crate::adapters::onnx::postprocess::{decode_output, letterbox};
use crate::application::ports::{DetectorLoaderPort, DetectorPort};
use crate::domain::detection::Detection;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::{ClassNames, YoloParams};

pub struct OnnxYoloEngine {
    // `run` needs exclusive access
    session: Mutex<Session>,
    names: ClassNames,
    /// Square input size baked into the graph, if it is not dynamic.
    fixed_input_size: Option<u32>,
    /// Export already applies NMS, when the metadata says either way.
    end_to_end: Option<bool>,
}

impl OnnxYoloEngine {
    pub fn load(path: &Path, intra_threads: usize) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .commit_from_file(path)?;

        let names = class_names(&session);
        let fixed_input_size = fixed_input_size(&session);
        let end_to_end = end_to_end(&session);
        info!(
            classes = names.len(),
            input_size = ?fixed_input_size,
            end_to_end = ?end_to_end,
            "onnx session ready"
        );

        Ok(Self {
            session: Mutex::new(session),
            names,
            fixed_input_size,
            end_to_end,
        })
    }

    pub fn infer(&self, rgb: &RgbImage, params: &YoloParams) -> Result<Vec<Detection>> {
        let imgsz = self.fixed_input_size.unwrap_or_else(|| params.inference_size());
        let (input, geometry) = letterbox(rgb, imgsz);

        let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
        let (data, _) = input.into_raw_vec_and_offset();
        let input_tensor = Tensor::from_array((input_shape, data))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("onnx session lock poisoned"))?;
        let outputs = session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let view = match array_view.ndim() {
            3 => array_view.index_axis_move(Axis(0), 0),
            2 => array_view,
            n => bail!("unexpected detection output rank {n}"),
        };

        decode_output(
            view.into_dimensionality::<Ix2>()?,
            &geometry,
            params,
            &self.names,
            self.end_to_end,
        )
    }
}

impl DetectorPort for OnnxYoloEngine {
    fn detect(&self, image: &RgbImage, params: &YoloParams) -> DomainResult<Vec<Detection>> {
        self.infer(image, params)
            .map_err(|e| DomainError::OperationFailed(format!("{e:#}")))
    }
}

fn class_names(session: &Session) -> ClassNames {
    let raw = session
        .metadata()
        .ok()
        .and_then(|m| m.custom("names").ok().flatten());

    match raw.as_deref().and_then(parse_class_names) {
        Some(names) if !names.is_empty() => names,
        _ => {
            warn!("model has no class names metadata, reporting class indices");
            ClassNames::default()
        }
    }
}

fn end_to_end(session: &Session) -> Option<bool> {
    let metadata = session.metadata().ok()?;
    let end2end = metadata.custom("end2end").ok().flatten();
    let args = metadata.custom("args").ok().flatten();
    parse_end_to_end(end2end.as_deref(), args.as_deref())
}

fn fixed_input_size(session: &Session) -> Option<u32> {
    let shape = session.inputs.first()?.input_type.tensor_shape()?;
    match shape.len() {
        4 if shape[2] > 0 && shape[2] == shape[3] => u32::try_from(shape[2]).ok(),
        _ => None,
    }
}

/// Builds ONNX Runtime detectors for the application layer.
pub struct OnnxDetectorLoader {
    intra_threads: usize,
}

impl OnnxDetectorLoader {
    pub fn new(intra_threads: usize) -> Self {
        Self { intra_threads }
    }
}

impl DetectorLoaderPort for OnnxDetectorLoader {
    fn load(&self, weights: &Path, params: &YoloParams) -> DomainResult<Arc<dyn DetectorPort>> {
        let engine = OnnxYoloEngine::load(weights, self.intra_threads)
            .map_err(|e| DomainError::ModelLoad(format!("{e:#}")))?;

        match engine.fixed_input_size {
            Some(size) if size != params.input_size => warn!(
                configured = params.input_size,
                model = size,
                "model has a fixed input size, ignoring YOLO_IMG_SIZE"
            ),
            None if params.inference_size() != params.input_size => warn!(
                configured = params.input_size,
                used = params.inference_size(),
                "YOLO_IMG_SIZE is not a multiple of the model stride, rounding up"
            ),
            _ => {}
        }
        Ok(Arc::new(engine))
    }
}
