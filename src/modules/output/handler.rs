use crate::common::response::{ApiError, ErrorResponse};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::io::ErrorKind;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// Download a rendered video
/// Any name that is not (yet) in the output area is reported as not found,
/// whether the job is still running, failed, or never existed.
#[utoipa::path(
    get,
    path = "/output/{filename}",
    params(
        ("filename" = String, Path, description = "Output file name, e.g. output_ab12cd34.mp4")
    ),
    responses(
        (status = 200, description = "Video stream", content_type = "video/mp4"),
        (status = 404, description = "File not found", body = ErrorResponse)
    ),
    tag = "Inference"
)]
pub async fn get_output(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    let Some(path) = state.storage.resolve_output(&filename) else {
        return ApiError::not_found().into_response();
    };

    let file = match File::open(&path).await {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return ApiError::not_found().into_response(),
        Err(e) => {
            tracing::error!("Failed to open {}: {}", path.display(), e);
            return ApiError(e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response();
        }
    };

    let metadata = match file.metadata().await {
        Ok(m) if m.is_file() => m,
        Ok(_) => return ApiError::not_found().into_response(),
        Err(e) => {
            tracing::error!("Failed to stat {}: {}", path.display(), e);
            return ApiError(e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response();
        }
    };

    let disposition = format!("attachment; filename=\"{}\"", filename.replace(['"', '\r', '\n'], "_"));
    let body = Body::from_stream(ReaderStream::new(file));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_LENGTH, metadata.len())
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// `GET /output/` with no file name.
pub async fn missing_output() -> Response {
    ApiError::not_found().into_response()
}
