use super::dto::PredictResponse;
use super::events::InferenceJob;
use crate::common::error::IntakeError;
use crate::common::upload::{stream_to_staging, write_to_staging, StagedInput};
use crate::state::AppState;
use axum::extract::Multipart;
use axum::http::StatusCode;
use base64::Engine;
use std::path::Path;
use tracing::info;

const DEFAULT_EXTENSION: &str = "wav";

pub struct PredictService;

impl PredictService {
    pub async fn accept_base64(state: &AppState, audio: Option<String>) -> Result<PredictResponse, IntakeError> {
        let audio = audio.ok_or(IntakeError::MissingAudio)?;
        let bytes = base64::engine::general_purpose::STANDARD.decode(audio.trim())?;
        if bytes.is_empty() {
            return Err(IntakeError::EmptyAudio);
        }

        let staged = write_to_staging(&state.storage, &bytes, DEFAULT_EXTENSION).await?;
        Self::dispatch(state, staged).await
    }

    /// Stages the first `audio` field; other fields are ignored.
    pub async fn accept_multipart(state: &AppState, mut multipart: Multipart) -> Result<PredictResponse, IntakeError> {
        loop {
            let field = match multipart.next_field().await {
                Ok(Some(f)) => f,
                Ok(None) => return Err(IntakeError::MissingAudio),
                Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                    return Err(IntakeError::PayloadTooLarge);
                }
                Err(e) => return Err(IntakeError::InvalidMultipart(e.body_text())),
            };

            if field.name() != Some("audio") {
                continue;
            }

            let extension = audio_extension(field.file_name());
            let staged = stream_to_staging(&state.storage, field, &extension).await?;
            return Self::dispatch(state, staged).await;
        }
    }

    async fn dispatch(state: &AppState, staged: StagedInput) -> Result<PredictResponse, IntakeError> {
        info!(
            "Staged {} bytes for job {} at {} ({} jobs waiting)",
            staged.size,
            staged.id,
            staged.path.display(),
            state.dispatcher.pending()
        );

        let job = InferenceJob {
            output_filename: staged.id.output_filename(),
            output_path: state.storage.output_path(&staged.id),
            input_path: staged.path.clone(),
            id: staged.id.clone(),
        };

        if let Err(e) = state.dispatcher.submit(job) {
            state.storage.discard(&staged.path).await;
            return Err(e.into());
        }

        Ok(PredictResponse {
            message: "Inference started".to_string(),
            output_file: staged.id.output_url(),
        })
    }
}

fn audio_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}
