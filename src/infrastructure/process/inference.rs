use crate::config::settings::InferenceConfig;
use crate::modules::predict::events::InferenceJob;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

const STDERR_TAIL_BYTES: usize = 2048;

/// What became of one invocation of the synthesis process. Only the presence
/// of the expected output file counts as success; the exit code is kept for
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceOutcome {
    Produced {
        output: PathBuf,
        exit_code: Option<i32>,
    },
    MissingOutput {
        exit_code: Option<i32>,
        stderr_tail: String,
    },
    SpawnFailed(String),
    TimedOut {
        after: Duration,
    },
}

impl InferenceOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InferenceOutcome::Produced { .. })
    }
}

/// Runs the external talking-head synthesis program for a job.
#[derive(Clone, Debug)]
pub struct InferenceRunner {
    config: InferenceConfig,
}

impl InferenceRunner {
    pub fn new(config: InferenceConfig) -> Self {
        Self { config }
    }

    pub fn render_args(&self, job: &InferenceJob) -> Vec<String> {
        let input = job.input_path.to_string_lossy();
        let output = job.output_path.to_string_lossy();

        self.config
            .args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output}", &output)
                    .replace("{id}", job.id.as_str())
            })
            .collect()
    }

    pub async fn run(&self, job: &InferenceJob) -> InferenceOutcome {
        let args = self.render_args(job);
        info!("🎬 Running inference for job {}", job.id);
        debug!("Invoking {} {:?}", self.config.program, args);

        let mut cmd = Command::new(&self.config.program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }

        let output = match self.config.timeout {
            // Dropping the future on timeout kills the child.
            Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
                Ok(result) => result,
                Err(_) => return InferenceOutcome::TimedOut { after: limit },
            },
            None => cmd.output().await,
        };

        let output = match output {
            Ok(o) => o,
            Err(e) => {
                return InferenceOutcome::SpawnFailed(format!(
                    "failed to start {}: {}",
                    self.config.program, e
                ));
            }
        };

        let exit_code = output.status.code();
        debug!(
            "Job {} exited with {:?} ({} bytes stdout, {} bytes stderr)",
            job.id,
            exit_code,
            output.stdout.len(),
            output.stderr.len()
        );

        if tokio::fs::try_exists(&job.output_path).await.unwrap_or(false) {
            InferenceOutcome::Produced {
                output: job.output_path.clone(),
                exit_code,
            }
        } else {
            InferenceOutcome::MissingOutput {
                exit_code,
                stderr_tail: tail(&output.stderr),
            }
        }
    }
}

fn tail(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&bytes[start..]).trim().to_string()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::common::job_id::JobId;

    fn sh(script: &str, timeout: Option<Duration>) -> InferenceRunner {
        InferenceRunner::new(InferenceConfig {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                script.to_string(),
                "sh".to_string(),
                "{input}".to_string(),
                "{output}".to_string(),
            ],
            working_dir: None,
            timeout,
        })
    }

    fn job_in(dir: &tempfile::TempDir) -> InferenceJob {
        let id = JobId::generate();
        let input_path = dir.path().join(id.input_filename("wav"));
        std::fs::write(&input_path, b"RIFF-audio").unwrap();
        InferenceJob {
            output_filename: id.output_filename(),
            output_path: dir.path().join(id.output_filename()),
            input_path,
            id,
        }
    }

    #[test]
    fn placeholders_are_substituted() {
        let runner = InferenceRunner::new(InferenceConfig {
            program: "python3".to_string(),
            args: vec!["--aud".into(), "{input}".into(), "--out={output}".into(), "{id}".into()],
            working_dir: None,
            timeout: None,
        });
        let dir = tempfile::TempDir::new().unwrap();
        let job = job_in(&dir);

        let args = runner.render_args(&job);

        assert_eq!(args[0], "--aud");
        assert_eq!(args[1], job.input_path.to_string_lossy());
        assert_eq!(args[2], format!("--out={}", job.output_path.to_string_lossy()));
        assert_eq!(args[3], job.id.as_str());
    }

    #[tokio::test]
    async fn given_process_writes_output_then_outcome_is_produced() {
        let dir = tempfile::TempDir::new().unwrap();
        let job = job_in(&dir);

        let outcome = sh("cp \"$1\" \"$2\"", None).run(&job).await;

        assert_eq!(
            outcome,
            InferenceOutcome::Produced {
                output: job.output_path.clone(),
                exit_code: Some(0)
            }
        );
        assert_eq!(std::fs::read(&job.output_path).unwrap(), b"RIFF-audio");
    }

    #[tokio::test]
    async fn given_failing_exit_code_but_output_present_then_still_produced() {
        let dir = tempfile::TempDir::new().unwrap();
        let job = job_in(&dir);

        let outcome = sh("cp \"$1\" \"$2\"; exit 7", None).run(&job).await;

        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn given_process_fails_without_output_then_stderr_is_kept() {
        let dir = tempfile::TempDir::new().unwrap();
        let job = job_in(&dir);

        let outcome = sh("echo 'CUDA out of memory' >&2; exit 3", None).run(&job).await;

        match outcome {
            InferenceOutcome::MissingOutput { exit_code, stderr_tail } => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr_tail, "CUDA out of memory");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn given_clean_exit_without_output_then_outcome_is_missing_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let job = job_in(&dir);

        let outcome = sh("exit 0", None).run(&job).await;

        assert!(matches!(
            outcome,
            InferenceOutcome::MissingOutput { exit_code: Some(0), .. }
        ));
    }

    #[tokio::test]
    async fn given_unknown_program_then_spawn_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let job = job_in(&dir);
        let runner = InferenceRunner::new(InferenceConfig {
            program: "definitely-not-a-real-binary-7f3a".to_string(),
            args: vec![],
            working_dir: None,
            timeout: None,
        });

        assert!(matches!(
            runner.run(&job).await,
            InferenceOutcome::SpawnFailed(_)
        ));
    }

    #[tokio::test]
    async fn given_hanging_process_then_it_times_out() {
        let dir = tempfile::TempDir::new().unwrap();
        let job = job_in(&dir);
        let limit = Duration::from_millis(200);

        let outcome = sh("sleep 30", Some(limit)).run(&job).await;

        assert_eq!(outcome, InferenceOutcome::TimedOut { after: limit });
    }

    #[test]
    fn stderr_tail_keeps_only_the_end() {
        let long = vec![b'x'; STDERR_TAIL_BYTES + 100];
        assert_eq!(tail(&long).len(), STDERR_TAIL_BYTES);
        assert_eq!(tail(b"  oops\n"), "oops");
    }
}
