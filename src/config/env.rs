use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerHost,
    ServerPort,
    UploadDir,
    OutputDir,
    InferenceProgram,
    InferenceArgs,
    InferenceWorkdir,
    InferenceWorkers,
    InferenceQueueCapacity,
    InferenceTimeoutSecs,
    MaxUploadBytes,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerHost => "APP_HOST",
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::UploadDir => "UPLOAD_DIR",
            EnvKey::OutputDir => "OUTPUT_DIR",
            EnvKey::InferenceProgram => "INFERENCE_PROGRAM",
            EnvKey::InferenceArgs => "INFERENCE_ARGS",
            EnvKey::InferenceWorkdir => "INFERENCE_WORKDIR",
            EnvKey::InferenceWorkers => "INFERENCE_WORKERS",
            EnvKey::InferenceQueueCapacity => "INFERENCE_QUEUE_CAPACITY",
            EnvKey::InferenceTimeoutSecs => "INFERENCE_TIMEOUT_SECS",
            EnvKey::MaxUploadBytes => "MAX_UPLOAD_BYTES",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
