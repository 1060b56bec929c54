use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PredictRequest {
    /// Base64-encoded audio clip (standard alphabet, padded).
    pub audio: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PredictResponse {
    pub message: String,
    /// Path to poll for the rendered video. It may not exist yet, or ever.
    pub output_file: String,
}
