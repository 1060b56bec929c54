use axum::http::StatusCode;
use thiserror::Error;

use crate::common::response::ApiError;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Missing 'audio' field in request.")]
    MissingAudio,
    #[error("Audio payload is empty.")]
    EmptyAudio,
    #[error("Invalid JSON payload: {0}")]
    InvalidJson(String),
    #[error("Invalid base64 audio: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("Invalid multipart payload: {0}")]
    InvalidMultipart(String),
    #[error("Expected request with `Content-Type: application/json` or `multipart/form-data`")]
    UnsupportedMediaType,
    #[error("Request body too large")]
    PayloadTooLarge,
    #[error("Failed to store audio: {0}")]
    Storage(#[from] std::io::Error),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Inference queue is full, try again later")]
    QueueFull,
    #[error("Inference dispatcher is not running")]
    Closed,
}

impl IntakeError {
    pub fn status(&self) -> StatusCode {
        match self {
            IntakeError::MissingAudio
            | IntakeError::EmptyAudio
            | IntakeError::InvalidJson(_)
            | IntakeError::InvalidBase64(_)
            | IntakeError::InvalidMultipart(_) => StatusCode::BAD_REQUEST,
            IntakeError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            IntakeError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            IntakeError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            IntakeError::Dispatch(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        ApiError(err.to_string(), err.status())
    }
}
