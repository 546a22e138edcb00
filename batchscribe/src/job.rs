use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::discover::{MediaFile, MediaKind};

/// Lifecycle of one file's transcription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Skipped,
    Error,
}

/// One file's unit of work. Identity is the path, unique within a run.
/// Mutated only by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub path: PathBuf,
    pub media: MediaKind,
    pub status: JobStatus,
    /// Media duration in seconds, 0 until the engine reports it.
    pub duration_secs: f64,
    pub progress_percent: f64,
}

impl Job {
    fn new(file: MediaFile) -> Self {
        Self {
            path: file.path,
            media: file.media,
            status: JobStatus::Pending,
            duration_secs: 0.0,
            progress_percent: 0.0,
        }
    }

    /// Apply a segment end-time to the progress percentage.
    ///
    /// Clamped to [0, 100] and never decreasing, so out-of-order input from
    /// the engine can't make progress appear to regress. With an unknown
    /// duration progress stays where it is (it snaps to 100 on success).
    pub(crate) fn apply_segment_progress(&mut self, segment_end_secs: f64) -> f64 {
        if self.duration_secs > 0.0 {
            let percent = (segment_end_secs / self.duration_secs * 100.0).clamp(0.0, 100.0);
            if percent > self.progress_percent {
                self.progress_percent = percent;
            }
        }
        self.progress_percent
    }
}

/// The job table for one start action, plus run-level bookkeeping.
///
/// Owned exclusively by the orchestrator; consumers only ever see
/// event-derived snapshots.
#[derive(Debug)]
pub struct BatchRun {
    jobs: Vec<Job>,
    index: HashMap<PathBuf, usize>,
    processed: usize,
    /// Wall-clock seconds per finished job. Completed jobs record their
    /// measured time; skipped jobs record 0.0 and are counted, deflating
    /// the ETA in proportion to the skip ratio (preserved source behavior).
    completed_secs: Vec<f64>,
}

impl BatchRun {
    pub fn new(files: Vec<MediaFile>) -> Self {
        let index = files
            .iter()
            .enumerate()
            .map(|(i, f)| (f.path.clone(), i))
            .collect();
        Self {
            jobs: files.into_iter().map(Job::new).collect(),
            index,
            processed: 0,
            completed_secs: Vec::new(),
        }
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn job(&self, index: usize) -> &Job {
        &self.jobs[index]
    }

    pub(crate) fn job_mut(&mut self, index: usize) -> &mut Job {
        &mut self.jobs[index]
    }

    pub fn index_of(&self, path: &Path) -> Option<usize> {
        self.index.get(path).copied()
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Record a job reaching a terminal status. `elapsed_secs` is Some for
    /// outcomes that feed the ETA average (completed, skipped), None for
    /// errors. Negative measurements are discarded.
    pub(crate) fn record_processed(&mut self, elapsed_secs: Option<f64>) {
        self.processed += 1;
        if let Some(secs) = elapsed_secs {
            if secs >= 0.0 {
                self.completed_secs.push(secs);
            }
        }
    }

    /// Estimated seconds remaining, or None until at least one duration has
    /// been recorded. Never reports a spurious zero for an unstarted batch.
    pub fn eta_secs(&self) -> Option<f64> {
        if self.completed_secs.is_empty() {
            return None;
        }
        let avg = self.completed_secs.iter().sum::<f64>() / self.completed_secs.len() as f64;
        Some(avg * (self.len() - self.processed) as f64)
    }

    /// Count of jobs currently in the given status.
    pub fn count(&self, status: JobStatus) -> usize {
        self.jobs.iter().filter(|j| j.status == status).count()
    }
}
