//! Managed fine-tuning jobs: the client contract and a bounded status poll.

use crate::error::{TrainingError, TrainingResult};
use crate::job::{TuningJobId, TuningJobSpec};
use crate::progress::{ProgressEvent, ProgressSink};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A snapshot of a job as reported by the tuning service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: TuningJobId,
    pub state: JobState,
    /// Resource name of the tuned model, once available.
    #[serde(default)]
    pub tuned_model: Option<String>,
    /// Serving endpoint of the tuned model, once available.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[async_trait]
pub trait FineTuneClient: Send + Sync {
    fn id(&self) -> &'static str;

    async fn submit(&self, job: &TuningJobSpec) -> TrainingResult<TuningJobId>;

    async fn status(&self, job_id: &TuningJobId) -> TrainingResult<JobStatus>;

    async fn cancel(&self, job_id: &TuningJobId) -> TrainingResult<()>;
}

#[derive(Debug, Clone)]
pub struct PollOptions {
    pub interval: Duration,
    /// Upper bound on total wall time spent polling.
    pub max_wait: Duration,
    /// Optional upper bound on status queries.
    pub max_polls: Option<u32>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self { interval: Duration::from_secs(10), max_wait: Duration::from_secs(12 * 60 * 60), max_polls: None }
    }
}

/// Poll `job_id` until it reaches a terminal state.
///
/// Query errors are logged and retried on the next tick. A job that ends
/// failed or cancelled is returned as [`TrainingError::Job`]; running out of
/// time or polls is [`TrainingError::PollTimeout`].
pub async fn poll_until_terminal(
    client: &dyn FineTuneClient,
    job_id: &TuningJobId,
    options: &PollOptions,
    progress: &dyn ProgressSink,
) -> TrainingResult<JobStatus> {
    let start = Instant::now();
    let mut polls: u32 = 0;

    loop {
        polls += 1;
        match client.status(job_id).await {
            Ok(status) => {
                progress.on_event(ProgressEvent::Polled {
                    job_id: job_id.clone(),
                    state: status.state,
                    elapsed_secs: start.elapsed().as_secs(),
                });
                if status.state.is_terminal() {
                    progress.on_event(ProgressEvent::Finished { job_id: job_id.clone(), state: status.state });
                    return match status.state {
                        JobState::Succeeded => Ok(status),
                        state => Err(TrainingError::Job { job: job_id.0.clone(), state, message: status.error }),
                    };
                }
                debug!(job_id = %job_id, state = %status.state, "Tuning job still in progress");
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Failed to query tuning job status; will retry");
                progress.on_event(ProgressEvent::PollFailed { job_id: job_id.clone(), error: e.to_string() });
            }
        }

        let out_of_polls = options.max_polls.is_some_and(|max| polls >= max);
        if out_of_polls || start.elapsed() + options.interval > options.max_wait {
            return Err(TrainingError::PollTimeout { job: job_id.0.clone(), waited: start.elapsed() });
        }

        tokio::time::sleep(options.interval).await;
    }
}
