use std::sync::Arc;
use crate::application::services::DetectionService;

/// Estado compartido para los manejadores HTTP de Axum.
/// Siguiendo la Arquitectura Hexagonal, el estado contiene los servicios (Casos de Uso),
/// nunca los adaptadores de infraestructura.
#[derive(Clone)]
pub struct HttpState {
    /// Servicio de detección: decodifica la imagen, carga el modelo una sola vez
    /// y ejecuta la inferencia.
    pub detection: Arc<DetectionService>,
}
