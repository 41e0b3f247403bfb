use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use tracing::debug;

use crate::adapters::http::state::HttpState;
use crate::application::dto::{HealthResponse, PredictResponse};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::media::SupportedMediaType;

/// Multipart field carrying the image.
pub const FILE_FIELD: &str = "file";

pub async fn health(State(st): State<HttpState>) -> Json<HealthResponse> {
    Json(st.detection.health())
}

pub async fn predict(
    State(st): State<HttpState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> DomainResult<Json<PredictResponse>> {
    let mut multipart = multipart.map_err(|e| DomainError::InvalidInput(e.body_text()))?;
    let image_bytes = read_image_field(&mut multipart).await?;
    let response = st.detection.predict(image_bytes).await?;
    Ok(Json(response))
}

/// Reads the `file` part. The declared type is checked before the body is
/// pulled off the wire.
async fn read_image_field(multipart: &mut Multipart) -> DomainResult<Vec<u8>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let media_type = SupportedMediaType::from_content_type(field.content_type())?;
        let data = field.bytes().await.map_err(multipart_error)?;
        debug!(media_type = media_type.as_str(), bytes = data.len(), "upload received");
        return Ok(data.to_vec());
    }
    Err(DomainError::InvalidInput(format!("Field required: {FILE_FIELD}")))
}

fn multipart_error(e: MultipartError) -> DomainError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        DomainError::PayloadTooLarge(e.body_text())
    } else {
        DomainError::MalformedRequest(format!("Multipart error: {}", e.body_text()))
    }
}
