use crate::common::error::DispatchError;
use crate::common::job_id::JobId;
use crate::config::settings::DispatchConfig;
use crate::infrastructure::process::{InferenceOutcome, InferenceRunner};
use crate::modules::predict::events::InferenceJob;
use async_channel::{Receiver, Sender, TrySendError};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

const REPORT_BUFFER: usize = 256;

/// Published once per finished job.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub id: JobId,
    pub outcome: InferenceOutcome,
}

/// Queue in front of the inference runner.
///
/// With `workers == 0` every job gets its own task and nothing limits how many
/// synthesis processes run at once. Otherwise a fixed pool drains the queue.
#[derive(Clone)]
pub struct JobDispatcher {
    sender: Sender<InferenceJob>,
    reports: broadcast::Sender<JobReport>,
}

impl JobDispatcher {
    pub fn start(runner: InferenceRunner, config: DispatchConfig) -> Self {
        let (sender, receiver) = if config.queue_capacity == 0 {
            async_channel::unbounded()
        } else {
            async_channel::bounded(config.queue_capacity)
        };
        let (reports, _) = broadcast::channel(REPORT_BUFFER);
        let runner = Arc::new(runner);

        if config.workers == 0 {
            info!("🎥 Starting inference dispatcher (one task per job)");
            tokio::spawn(spawn_per_job(runner, receiver, reports.clone()));
        } else {
            info!("🎥 Starting {} inference workers", config.workers);
            for worker in 0..config.workers {
                tokio::spawn(worker_loop(worker, runner.clone(), receiver.clone(), reports.clone()));
            }
        }

        Self { sender, reports }
    }

    /// Enqueue without waiting. Fails when a bounded queue is full.
    pub fn submit(&self, job: InferenceJob) -> Result<(), DispatchError> {
        match self.sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job)) => {
                warn!("Inference queue full, rejecting job {}", job.id);
                Err(DispatchError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => Err(DispatchError::Closed),
        }
    }

    #[allow(dead_code)]
    pub fn subscribe(&self) -> broadcast::Receiver<JobReport> {
        self.reports.subscribe()
    }

    pub fn pending(&self) -> usize {
        self.sender.len()
    }
}

async fn spawn_per_job(
    runner: Arc<InferenceRunner>,
    receiver: Receiver<InferenceJob>,
    reports: broadcast::Sender<JobReport>,
) {
    while let Ok(job) = receiver.recv().await {
        let runner = runner.clone();
        let reports = reports.clone();
        tokio::spawn(async move {
            process_job(&runner, job, &reports).await;
        });
    }
    info!("Inference dispatcher stopped");
}

async fn worker_loop(
    worker: usize,
    runner: Arc<InferenceRunner>,
    receiver: Receiver<InferenceJob>,
    reports: broadcast::Sender<JobReport>,
) {
    while let Ok(job) = receiver.recv().await {
        info!("📦 Worker {} picked up job {}", worker, job.id);
        process_job(&runner, job, &reports).await;
    }
    info!("Inference worker {} stopped", worker);
}

async fn process_job(runner: &InferenceRunner, job: InferenceJob, reports: &broadcast::Sender<JobReport>) {
    let outcome = runner.run(&job).await;

    match &outcome {
        InferenceOutcome::Produced { output, exit_code } => {
            info!("✅ Job {} produced {} (exit {:?})", job.id, output.display(), exit_code);
        }
        InferenceOutcome::MissingOutput { exit_code, stderr_tail } => {
            warn!(
                "❌ Job {} exited with {:?} but {} was not produced: {}",
                job.id, exit_code, job.output_filename, stderr_tail
            );
        }
        InferenceOutcome::SpawnFailed(reason) => {
            error!("❌ Job {} could not start: {}", job.id, reason);
        }
        InferenceOutcome::TimedOut { after } => {
            error!("❌ Job {} killed after {:?}", job.id, after);
        }
    }

    if !outcome.is_success() {
        debug!("Staged input for job {} kept at {}", job.id, job.input_path.display());
    }

    // No subscribers is the normal case in production.
    let _ = reports.send(JobReport { id: job.id, outcome });
}
