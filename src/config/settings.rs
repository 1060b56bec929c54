use std::path::PathBuf;
use std::time::Duration;

use crate::config::env::{self, EnvKey};

/// The fixed invocation of the synthesis script. `{input}` is replaced by the
/// absolute path of the staged audio file.
pub const DEFAULT_INFERENCE_ARGS: &str = "main.py data/May --workspace model/trial_may -O --test --test_train --asr_model ave --portrait --aud {input}";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub inference: InferenceConfig,
    pub dispatch: DispatchConfig,
}

#[derive(Clone, Debug)]
pub struct InferenceConfig {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

/// `workers == 0` spawns one task per job; `queue_capacity == 0` never rejects.
#[derive(Clone, Copy, Debug, Default)]
pub struct DispatchConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl AppConfig {
    pub fn new() -> Self {
        let timeout_secs: u64 = env::get_parsed(EnvKey::InferenceTimeoutSecs, 0);

        Self {
            server_host: env::get_or(EnvKey::ServerHost, "0.0.0.0"),
            server_port: env::get_parsed(EnvKey::ServerPort, 8000),
            upload_dir: PathBuf::from(env::get_or(EnvKey::UploadDir, "./uploads")),
            output_dir: PathBuf::from(env::get_or(EnvKey::OutputDir, "./outputs")),
            max_upload_bytes: env::get_parsed(EnvKey::MaxUploadBytes, 100 * 1024 * 1024),
            inference: InferenceConfig {
                program: env::get_or(EnvKey::InferenceProgram, "python3"),
                args: split_args(&env::get_or(EnvKey::InferenceArgs, DEFAULT_INFERENCE_ARGS)),
                working_dir: env::get(EnvKey::InferenceWorkdir)
                    .ok()
                    .filter(|dir| !dir.trim().is_empty())
                    .map(PathBuf::from),
                timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            },
            dispatch: DispatchConfig {
                workers: env::get_parsed(EnvKey::InferenceWorkers, 0),
                queue_capacity: env::get_parsed(EnvKey::InferenceQueueCapacity, 0),
            },
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

// No quoting support: arguments containing spaces cannot be expressed.
fn split_args(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}
