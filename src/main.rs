mod adapters;
mod application;
mod config;
mod domain;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::adapters::{
    http::{router, state::HttpState},
    onnx::{model_catalog::OnnxModelCatalog, yolo_engine::OnnxDetectorLoader},
};
use crate::application::services::DetectionService;
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Cargar .env (opcional) e inicializar logs (RUST_LOG=info por defecto)
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 2. Leer la configuración del entorno una sola vez; valores inválidos abortan el arranque
    let cfg = AppConfig::from_env()?;
    tracing::info!(
        model = %cfg.model_path,
        img_size = cfg.img_size,
        conf = cfg.conf,
        iou = cfg.iou,
        max_det = cfg.max_det,
        threads = cfg.threads,
        "configuration loaded"
    );

    // 3. Instanciar Adaptadores (Capa de Infraestructura)
    // Usamos Arc porque serán compartidos por el servicio y el servidor HTTP.
    let catalog = Arc::new(OnnxModelCatalog::new());
    let loader = Arc::new(OnnxDetectorLoader::new(cfg.threads));
    // 4. Instanciar el Servicio (Capa de Aplicación - Caso de Uso)
    // El modelo NO se carga aquí: se carga en la primera petición a /predict.
    let detection = Arc::new(DetectionService::new(cfg.model(), cfg.params(), catalog, loader));

    // 5. Precarga opcional (YOLO_PRELOAD); un fallo solo se registra
    if cfg.preload {
        detection.preload().await;
    }

    // 6. Configurar el Estado de la API y el Router de Axum
    let app = router(HttpState { detection }, cfg.max_upload_bytes);

    // 7. Lanzar el Servidor con apagado ordenado (Ctrl-C / SIGTERM)
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;
    tracing::info!("YOLO inference API listening on http://{}", cfg.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("ctrl-c handler unavailable: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
}
