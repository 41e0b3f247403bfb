pub mod error;
pub mod routes;
pub mod state;

use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};
use tower_http::trace::TraceLayer;
use crate::adapters::http::state::HttpState;

pub fn router(state: HttpState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/predict", post(routes::predict))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::onnx::model_catalog::OnnxModelCatalog;
    use crate::application::services::DetectionService;
    use crate::application::testing::*;
    use crate::domain::detection::Detection;
    use crate::domain::model::{ModelId, YoloParams};
    use axum::body::{to_bytes, Body};
    use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
    use image::ImageFormat;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "----yolo-test-boundary";

    fn app(service: DetectionService) -> Router {
        router(HttpState { detection: Arc::new(service) }, 1024 * 1024)
    }

    fn app_with(detections: Vec<Detection>) -> Router {
        app(service_with(FakeCatalog::present(), FakeLoader::new(detections)).0)
    }

    fn upload(field: &str, content_type: &str, body: &[u8]) -> Request<Body> {
        let mut data = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        data.extend_from_slice(body);
        data.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::post("/predict")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(data))
            .unwrap()
    }

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn health_request() -> Request<Body> {
        Request::get("/health").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_config_and_load_state() {
        let app = app_with(vec![]);

        let (status, body) = call(&app, health_request()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["model_path"], MODEL_PATH);
        assert_eq!(body["img_size"], 640);
        assert_eq!(body["conf"], 0.25);
        assert_eq!(body["loaded"], false);

        let png = encode_solid(32, 32, ImageFormat::Png);
        let (status, _) = call(&app, upload("file", "image/png", &png)).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&app, health_request()).await;
        assert_eq!(body["loaded"], true);
    }

    #[tokio::test]
    async fn text_upload_is_unsupported() {
        let app = app_with(vec![]);
        let png = encode_solid(8, 8, ImageFormat::Png);
        for body in [&b"hello"[..], &png[..]] {
            let (status, json) = call(&app, upload("file", "text/plain", body)).await;
            assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
            assert_eq!(json["detail"], "Unsupported image type");
        }
    }

    #[tokio::test]
    async fn empty_or_corrupt_jpeg_is_bad_request() {
        let app = app_with(vec![]);
        for body in [&b""[..], &b"\xff\xd8\xff\xe0 truncated"[..]] {
            let (status, json) = call(&app, upload("file", "image/jpeg", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(json["detail"].as_str().unwrap().starts_with("Invalid image content"));
        }
    }

    #[tokio::test]
    async fn solid_image_without_objects_is_empty() {
        let app = app_with(vec![]);
        let jpeg = encode_solid(64, 48, ImageFormat::Jpeg);
        let (status, body) = call(&app, upload("file", "image/jpeg", &jpeg)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["count"], 0);
        assert_eq!(body["detections"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn detections_are_returned_in_order() {
        let app = app_with(vec![
            detection(0, "person", 0.9, [1.0, 2.0, 30.0, 40.0]),
            detection(16, "dog", 0.4, [5.0, 6.0, 7.0, 8.0]),
        ]);
        let png = encode_solid(64, 64, ImageFormat::Png);
        let (status, body) = call(&app, upload("file", "image/png", &png)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        let dets = body["detections"].as_array().unwrap();
        assert_eq!(dets[0]["class_name"], "person");
        assert_eq!(dets[1]["class_id"], 16);
        for det in dets {
            let conf = det["confidence"].as_f64().unwrap();
            let bbox: Vec<f64> = det["bbox"].as_array().unwrap().iter().filter_map(Value::as_f64).collect();
            assert!((0.0..=1.0).contains(&conf));
            assert!(bbox[0] < bbox[2] && bbox[1] < bbox[3]);
        }
    }

    #[tokio::test]
    async fn missing_model_is_server_error_naming_the_path() {
        let service = DetectionService::new(
            ModelId::from_path("/nonexistent/weights/best.onnx"),
            YoloParams::default(),
            Arc::new(OnnxModelCatalog::new()),
            Arc::new(FakeLoader::new(vec![])),
        );
        let app = app(service);

        let png = encode_solid(16, 16, ImageFormat::Png);
        let (status, body) = call(&app, upload("file", "image/png", &png)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let detail = body["detail"].as_str().unwrap();
        assert!(detail.starts_with("Model load error"));
        assert!(detail.contains("/nonexistent/weights/best.onnx"));

        let (status, body) = call(&app, health_request()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["loaded"], false);
    }

    #[tokio::test]
    async fn missing_file_field_is_unprocessable() {
        let app = app_with(vec![]);
        let png = encode_solid(8, 8, ImageFormat::Png);
        let (status, body) = call(&app, upload("image", "image/png", &png)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"], "Field required: file");
    }

    #[tokio::test]
    async fn non_multipart_body_is_unprocessable() {
        let app = app_with(vec![]);
        let req = Request::post("/predict")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());
    }
}
