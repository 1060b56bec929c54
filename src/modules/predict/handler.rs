use super::dto::{PredictRequest, PredictResponse};
use super::service::PredictService;
use crate::common::error::IntakeError;
use crate::common::response::{ApiError, ApiSuccess, ErrorResponse};
use crate::state::AppState;
use axum::{
    extract::{Multipart, Request, State},
    http::{header, StatusCode},
    response::IntoResponse,
    RequestExt,
};
use bytes::Bytes;
use tracing::{error, warn};

/// Submit an audio clip for talking-head synthesis
///
/// Accepts either `application/json` with a base64 `audio` field or
/// `multipart/form-data` with an `audio` file field. Returns as soon as the
/// clip is staged; the video shows up at `output_file` once inference is done.
#[utoipa::path(
    post,
    path = "/predict/",
    request_body(content = PredictRequest, content_type = "application/json"),
    responses(
        (status = 200, description = "Inference started", body = PredictResponse),
        (status = 400, description = "Bad Request", body = ErrorResponse),
        (status = 413, description = "Payload Too Large", body = ErrorResponse),
        (status = 415, description = "Unsupported Media Type", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
        (status = 503, description = "Queue Full", body = ErrorResponse)
    ),
    tag = "Inference"
)]
pub async fn predict(State(state): State<AppState>, req: Request) -> impl IntoResponse {
    match submit(&state, req).await {
        Ok(res) => ApiSuccess(res, StatusCode::OK).into_response(),
        Err(e) => {
            if e.status().is_server_error() {
                error!("Predict request failed: {}", e);
            } else {
                warn!("Rejected predict request: {}", e);
            }
            ApiError::from(e).into_response()
        }
    }
}

async fn submit(state: &AppState, req: Request) -> Result<PredictResponse, IntakeError> {
    let content_type = match req.headers().get(header::CONTENT_TYPE) {
        Some(value) => value
            .to_str()
            .map_err(|_| IntakeError::UnsupportedMediaType)?
            .to_ascii_lowercase(),
        None => String::new(),
    };

    if content_type.starts_with("multipart/form-data") {
        let multipart = req
            .extract::<Multipart, _>()
            .await
            .map_err(|e| IntakeError::InvalidMultipart(e.body_text()))?;
        return PredictService::accept_multipart(state, multipart).await;
    }

    // A missing content type is read as JSON, like most clients of this endpoint send it.
    if content_type.is_empty() || content_type.starts_with("application/json") {
        let body = req.extract::<Bytes, _>().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                IntakeError::PayloadTooLarge
            } else {
                IntakeError::InvalidJson(e.body_text())
            }
        })?;
        let payload: PredictRequest =
            serde_json::from_slice(&body).map_err(|e| IntakeError::InvalidJson(e.to_string()))?;
        return PredictService::accept_base64(state, payload.audio).await;
    }

    Err(IntakeError::UnsupportedMediaType)
}
