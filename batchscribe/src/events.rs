use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use serde::Serialize;

use crate::job::JobStatus;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// All jobs reached a terminal status.
    Finished,
    /// A single stop request let the in-flight job finish, then exited.
    StoppedAfterCurrent,
    /// An escalated stop aborted the run mid-flight.
    Cancelled,
    /// The model never loaded; no job was attempted.
    LoadFailed,
}

/// Final accounting for one run. Published as the last event on every
/// path — a batch never ends silently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub completed: usize,
    pub skipped: usize,
    pub errored: usize,
    pub outcome: RunOutcome,
}

impl RunSummary {
    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One-way status stream from the orchestrator to its consumer.
///
/// Per-job events arrive in emission order; cross-job ordering follows the
/// orchestrator's sequential processing order.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    JobStatusChanged {
        path: PathBuf,
        status: JobStatus,
    },
    JobProgressChanged {
        path: PathBuf,
        percent: f64,
    },
    BatchProgressChanged {
        processed: usize,
        total: usize,
        /// None until at least one job duration has been recorded.
        eta_secs: Option<f64>,
    },
    RunFinished(RunSummary),
}

/// Marshals orchestrator state changes onto a channel without ever
/// blocking the orchestrator. A consumer that went away is ignored — the
/// run completes whether or not anyone is listening.
pub struct StatusPublisher {
    tx: Option<Sender<RunEvent>>,
}

impl StatusPublisher {
    pub fn new(tx: Sender<RunEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A publisher with no consumer, for headless runs and tests.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn publish(&self, event: RunEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn job_status(&self, path: &Path, status: JobStatus) {
        self.publish(RunEvent::JobStatusChanged {
            path: path.to_path_buf(),
            status,
        });
    }

    pub fn job_progress(&self, path: &Path, percent: f64) {
        self.publish(RunEvent::JobProgressChanged {
            path: path.to_path_buf(),
            percent,
        });
    }

    pub fn batch_progress(&self, processed: usize, total: usize, eta_secs: Option<f64>) {
        self.publish(RunEvent::BatchProgressChanged {
            processed,
            total,
            eta_secs,
        });
    }
}
