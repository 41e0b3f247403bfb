use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::{
    application::{
        decode::decode_rgb,
        dto::{HealthResponse, PredictResponse},
        ports::{DetectorLoaderPort, DetectorPort, ModelCatalogPort},
    },
    domain::{
        errors::{DomainError, DomainResult},
        model::{ModelId, YoloParams},
    },
};

/// Servicio de detección: todo el camino de una petición a `/predict`
/// (decodificar, asegurar el modelo cargado, inferir).
///
/// El detector se inicializa en el primer uso. Las primeras peticiones
/// concurrentes esperan una única carga; si la carga falla la celda queda
/// vacía y la siguiente petición lo vuelve a intentar.
pub struct DetectionService {
    model: ModelId,
    params: YoloParams,
    catalog: Arc<dyn ModelCatalogPort>,
    loader: Arc<dyn DetectorLoaderPort>,
    detector: OnceCell<Arc<dyn DetectorPort>>,
}

impl DetectionService {
    pub fn new(
        model: ModelId,
        params: YoloParams,
        catalog: Arc<dyn ModelCatalogPort>,
        loader: Arc<dyn DetectorLoaderPort>,
    ) -> Self {
        Self {
            model,
            params,
            catalog,
            loader,
            detector: OnceCell::new(),
        }
    }

    /// Indica si el modelo ya está en memoria. Nunca dispara la carga.
    pub fn is_loaded(&self) -> bool {
        self.detector.initialized()
    }

    /// Estado para `/health`: configuración y si el modelo está cargado.
    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            ok: true,
            model_path: self.model.path.clone(),
            img_size: self.params.input_size,
            conf: self.params.conf_threshold,
            loaded: self.is_loaded(),
        }
    }

    /// Devuelve el detector, cargándolo si hace falta (una sola carga en vuelo).
    /// Cualquier fallo se reporta como `ModelLoad`.
    pub async fn ensure_loaded(&self) -> DomainResult<Arc<dyn DetectorPort>> {
        let detector = self
            .detector
            .get_or_try_init(|| self.load())
            .await
            .map_err(|e| match e {
                DomainError::ModelLoad(_) => e,
                other => DomainError::ModelLoad(other.to_string()),
            })?;
        Ok(detector.clone())
    }

    /// Carga en el arranque. Un fallo solo se registra; las peticiones reintentan.
    pub async fn preload(&self) {
        if let Err(e) = self.ensure_loaded().await {
            warn!(model = %self.model.path, "preload failed: {e}");
        }
    }

    /// Decodifica, asegura el modelo y ejecuta la inferencia.
    /// El orden importa: una imagen inválida da 400 antes de tocar el modelo.
    pub async fn predict(&self, image_bytes: Vec<u8>) -> DomainResult<PredictResponse> {
        let image = tokio::task::spawn_blocking(move || decode_rgb(&image_bytes))
            .await
            .map_err(|e| DomainError::OperationFailed(format!("decode task: {e}")))??;

        let detector = self.ensure_loaded().await?;

        let params = self.params.clone();
        let (width, height) = image.dimensions();
        let started = Instant::now();
        let detections = tokio::task::spawn_blocking(move || detector.detect(&image, &params))
            .await
            .map_err(|e| DomainError::OperationFailed(format!("inference task: {e}")))??;

        debug!(
            width,
            height,
            count = detections.len(),
            infer_ms = started.elapsed().as_secs_f32() * 1000.0,
            "prediction finished"
        );
        Ok(PredictResponse::from(detections))
    }

    /// Localiza los pesos y construye el detector fuera del ejecutor async.
    async fn load(&self) -> DomainResult<Arc<dyn DetectorPort>> {
        let weights = self.catalog.locate(&self.model).await?;
        info!(model = %self.model.name, path = %weights.display(), "loading model");

        let loader = self.loader.clone();
        let params = self.params.clone();
        let started = Instant::now();
        let detector = tokio::task::spawn_blocking(move || loader.load(&weights, &params))
            .await
            .map_err(|e| DomainError::ModelLoad(format!("load task: {e}")))??;

        info!(elapsed_ms = started.elapsed().as_millis() as u64, "model loaded");
        Ok(detector)
    }
}
