use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::error::AdapterError;

/// Error rendered as `{"error": "<message>"}` with a matching status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<AdapterError> for ApiError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::AuthRejected(message) => Self::unauthorized(message),
            AdapterError::InvalidInput(message) => Self::bad_request(message),
            err @ AdapterError::Timeout { .. } => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, err.to_string())
            }
            err => {
                error!(error = %err, "upstream operation failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
