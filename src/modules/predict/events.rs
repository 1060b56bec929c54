use crate::common::job_id::JobId;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct InferenceJob {
    pub id: JobId,
    pub input_path: PathBuf,
    pub output_filename: String,
    pub output_path: PathBuf, // where the result is expected, not guaranteed
}
