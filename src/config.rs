use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

use crate::domain::model::{ModelId, YoloParams};

pub const DEFAULT_MODEL_PATH: &str = "/models/best.pt";

/// Upper bound for `YOLO_IMG_SIZE`; the input tensor grows with its square.
pub const MAX_IMG_SIZE: u32 = 4096;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Process-wide settings, read once at start-up.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model_path: String,
    pub img_size: u32,
    pub conf: f32,
    pub iou: f32,
    pub max_det: usize,
    pub threads: usize,
    pub preload: bool,
    pub max_upload_bytes: usize,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the config from an arbitrary variable source. Unset or blank
    /// variables take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = YoloParams::default();

        let model_path = get("YOLO_MODEL").unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string());
        let img_size: u32 = parse(&get, "YOLO_IMG_SIZE", defaults.input_size)?;
        if img_size == 0 {
            return Err(invalid("YOLO_IMG_SIZE", "0", "must be positive"));
        }
        if img_size > MAX_IMG_SIZE {
            return Err(invalid(
                "YOLO_IMG_SIZE",
                &img_size.to_string(),
                format!("must not exceed {MAX_IMG_SIZE}"),
            ));
        }
        let conf = unit_interval("YOLO_CONF", parse(&get, "YOLO_CONF", defaults.conf_threshold)?)?;
        let iou = unit_interval("YOLO_IOU", parse(&get, "YOLO_IOU", defaults.iou_threshold)?)?;
        let max_det = parse(&get, "YOLO_MAX_DET", defaults.max_detections)?;
        let threads: usize = parse(&get, "YOLO_THREADS", 4)?;
        if threads == 0 {
            return Err(invalid("YOLO_THREADS", "0", "must be positive"));
        }
        let preload = match get("YOLO_PRELOAD") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| invalid("YOLO_PRELOAD", &raw, "expected a boolean"))?,
            None => false,
        };
        let max_upload_bytes = parse(&get, "YOLO_MAX_UPLOAD_BYTES", 32 * 1024 * 1024)?;
        let bind_addr = parse(&get, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8000)))?;

        Ok(Self {
            model_path,
            img_size,
            conf,
            iou,
            max_det,
            threads,
            preload,
            max_upload_bytes,
            bind_addr,
        })
    }

    pub fn model(&self) -> ModelId {
        ModelId::from_path(self.model_path.clone())
    }

    pub fn params(&self) -> YoloParams {
        YoloParams {
            input_size: self.img_size,
            conf_threshold: self.conf,
            iou_threshold: self.iou,
            max_detections: self.max_det,
        }
    }
}

fn parse<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(var, &raw, e.to_string())),
        None => Ok(default),
    }
}

fn unit_interval(var: &'static str, value: f32) -> Result<f32, ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(invalid(var, &value.to_string(), "must be within [0, 1]"))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.into(),
    }
}
