pub mod metadata;
pub mod model_catalog;
pub mod postprocess;
pub mod yolo_engine;
