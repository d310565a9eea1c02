use crate::job::TuningJobId;
use crate::tuning::JobState;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Submitted { job_id: TuningJobId },
    Polled { job_id: TuningJobId, state: JobState, elapsed_secs: u64 },
    PollFailed { job_id: TuningJobId, error: String },
    Finished { job_id: TuningJobId, state: JobState },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

#[derive(Debug, Default)]
pub struct StdoutProgressSink;

impl ProgressSink for StdoutProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Submitted { job_id } => println!("[tune:{job_id}] submitted"),
            ProgressEvent::Polled { job_id, state, elapsed_secs } => {
                println!("[tune:{job_id}] {state} ({elapsed_secs}s)");
            }
            ProgressEvent::PollFailed { job_id, error } => println!("[tune:{job_id}] status query failed: {error}"),
            ProgressEvent::Finished { job_id, state } => println!("[tune:{job_id}] finished: {state}"),
        }
    }
}

/// Reports progress through `tracing`, keeping stdout free for `--json` output.
#[derive(Debug, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Submitted { job_id } => info!(job_id = %job_id, "Tuning job submitted"),
            ProgressEvent::Polled { job_id, state, elapsed_secs } => {
                info!(job_id = %job_id, state = %state, elapsed_secs, "Tuning job polled");
            }
            ProgressEvent::PollFailed { job_id, error } => warn!(job_id = %job_id, error = %error, "Status query failed"),
            ProgressEvent::Finished { job_id, state } => info!(job_id = %job_id, state = %state, "Tuning job finished"),
        }
    }
}

/// Keeps every event; handy in tests.
#[derive(Debug, Default)]
pub struct RecordingProgressSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgressSink {
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ProgressSink for RecordingProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
