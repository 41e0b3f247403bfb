use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use tracing::{error, warn};

use crate::application::dto::ErrorResponse;
use crate::domain::errors::DomainError;

impl DomainError {
    pub fn status(&self) -> StatusCode {
        match self {
            DomainError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            DomainError::InvalidImage(_) | DomainError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            DomainError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DomainError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            DomainError::NotFound(_) | DomainError::ModelLoad(_) | DomainError::OperationFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            DomainError::OperationFailed(cause) => {
                error!("request failed: {cause}");
                "Internal Server Error".to_string()
            }
            DomainError::ModelLoad(_) | DomainError::NotFound(_) => {
                warn!("{self}");
                self.to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { detail })).into_response()
    }
}
