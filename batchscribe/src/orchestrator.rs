use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::cancel::{CancelState, CancelToken};
use crate::config::RunConfig;
use crate::discover;
use crate::engine::{Engine, EngineModel, ModelSpec, Transcription, TranscribeRequest};
use crate::error::{Error, Result};
use crate::events::{RunEvent, RunOutcome, RunSummary, StatusPublisher};
use crate::job::{BatchRun, JobStatus};
use crate::outputs;
use crate::types::Segment;

/// The batch sequencer. Owns the job table, drives every file through
/// discovery → skip policy → engine → output writer, and is the sole
/// writer of job status. Runs on one background thread; consumers observe
/// it only through the published event stream.
pub struct Orchestrator<E: Engine> {
    config: RunConfig,
    engine: E,
    token: CancelToken,
    publisher: StatusPublisher,
}

impl<E: Engine> Orchestrator<E> {
    pub fn new(
        config: RunConfig,
        engine: E,
        token: CancelToken,
        publisher: StatusPublisher,
    ) -> Self {
        Self {
            config,
            engine,
            token,
            publisher,
        }
    }

    /// Execute one batch run to completion, cooperative stop, or abort.
    ///
    /// Always ends by publishing a `RunFinished` summary. Returns `Err`
    /// only for a fatal model-load failure; job-level failures are
    /// reflected in the summary instead.
    pub fn run(self) -> Result<RunSummary> {
        let files = discover::discover(&self.config.input, self.config.mode);
        let mut run = BatchRun::new(files);
        info!(
            input = %self.config.input.display(),
            total = run.len(),
            "batch run starting"
        );

        self.publisher.batch_progress(0, run.len(), None);

        if run.is_empty() {
            return Ok(self.finish(&run, RunOutcome::Finished));
        }

        // Checkpoint: before model load.
        if self.token.immediate() {
            return Ok(self.finish(&run, RunOutcome::Cancelled));
        }

        let spec = ModelSpec {
            model: self.config.model.clone(),
            quantization: self.config.quantization.clone(),
            device: self.config.device,
            compute_type: self.config.compute_type.clone(),
            cache_dir: self.config.resolve_cache_dir(),
        };

        let mut model = match self.engine.load(&spec) {
            Ok(model) => model,
            Err(e) => {
                error!(error = %e, "model load failed, aborting run");
                self.finish(&run, RunOutcome::LoadFailed);
                return Err(e);
            }
        };

        let request = TranscribeRequest {
            beam_size: self.config.beam_size,
            vad_filter: self.config.vad_filter,
            word_timestamps: self.config.word_timestamps,
            language: self.config.language.clone(),
        };

        let mut outcome = RunOutcome::Finished;

        for i in 0..run.len() {
            // Checkpoints: before starting each file. A lone stop request
            // only exits once at least one file has been processed.
            match self.token.state() {
                CancelState::StopImmediate => {
                    outcome = RunOutcome::Cancelled;
                    break;
                }
                CancelState::StopAfterCurrent if run.processed() > 0 => {
                    info!("stop requested, exiting after current file");
                    outcome = RunOutcome::StoppedAfterCurrent;
                    break;
                }
                _ => {}
            }

            let path = run.job(i).path.clone();
            let media = run.job(i).media;

            // Pre-flight skip, before any engine work.
            if outputs::should_skip(&path, media, self.config.overwrite_existing) {
                info!(path = %path.display(), "timed output exists, skipping");
                run.job_mut(i).status = JobStatus::Skipped;
                self.publisher.job_status(&path, JobStatus::Skipped);
                run.record_processed(Some(0.0));
                self.publisher
                    .batch_progress(run.processed(), run.len(), run.eta_secs());
                continue;
            }

            run.job_mut(i).status = JobStatus::Processing;
            self.publisher.job_status(&path, JobStatus::Processing);

            let started = Instant::now();
            let mut interrupted = false;

            match self.process_job(&mut model, &mut run, i, &request) {
                Ok(()) => {
                    let job = run.job_mut(i);
                    job.status = JobStatus::Completed;
                    job.progress_percent = 100.0;
                    self.publisher.job_progress(&path, 100.0);
                    self.publisher.job_status(&path, JobStatus::Completed);
                    run.record_processed(Some(started.elapsed().as_secs_f64()));
                }
                Err(Error::Interrupted) => {
                    warn!(path = %path.display(), "interrupted mid-file, no outputs written");
                    run.job_mut(i).status = JobStatus::Error;
                    self.publisher.job_status(&path, JobStatus::Error);
                    run.record_processed(None);
                    interrupted = true;
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "job failed");
                    run.job_mut(i).status = JobStatus::Error;
                    self.publisher.job_status(&path, JobStatus::Error);
                    run.record_processed(None);
                }
            }

            self.publisher
                .batch_progress(run.processed(), run.len(), run.eta_secs());

            if interrupted {
                outcome = RunOutcome::Cancelled;
                break;
            }
        }

        // Engine resources are released before the summary goes out.
        drop(model);

        Ok(self.finish(&run, outcome))
    }

    fn process_job(
        &self,
        model: &mut E::Model,
        run: &mut BatchRun,
        index: usize,
        request: &TranscribeRequest,
    ) -> Result<()> {
        let path = run.job(index).path.clone();
        let media = run.job(index).media;

        let Transcription { segments, info } = model.transcribe(&path, request)?;

        run.job_mut(index).duration_secs = info.duration_secs.max(0.0);
        debug!(
            path = %path.display(),
            duration_secs = info.duration_secs,
            language = info.language.as_deref().unwrap_or("unknown"),
            "duration reported"
        );

        let mut collected: Vec<Segment> = Vec::new();
        for segment in segments {
            // Checkpoint: once per yielded segment.
            if self.token.immediate() {
                return Err(Error::Interrupted);
            }
            let segment = segment?;
            let percent = run.job_mut(index).apply_segment_progress(segment.end);
            self.publisher.job_progress(&path, percent);
            collected.push(segment);
        }

        // Checkpoint: transcription done, nothing written yet.
        if self.token.immediate() {
            return Err(Error::Interrupted);
        }

        outputs::write_outputs(&path, media, &collected)?;
        Ok(())
    }

    fn finish(&self, run: &BatchRun, outcome: RunOutcome) -> RunSummary {
        let summary = RunSummary {
            total: run.len(),
            completed: run.count(JobStatus::Completed),
            skipped: run.count(JobStatus::Skipped),
            errored: run.count(JobStatus::Error),
            outcome,
        };
        info!(
            total = summary.total,
            completed = summary.completed,
            skipped = summary.skipped,
            errored = summary.errored,
            outcome = ?summary.outcome,
            "batch run finished"
        );
        self.publisher.publish(RunEvent::RunFinished(summary.clone()));
        summary
    }
}

/// Spawn the orchestrator loop on its own thread and hand back the event
/// stream. The final `RunFinished` event is published before the join
/// handle resolves, so draining the receiver to completion is safe.
pub fn run_in_background<E>(
    config: RunConfig,
    engine: E,
    token: CancelToken,
) -> (Receiver<RunEvent>, JoinHandle<Result<RunSummary>>)
where
    E: Engine + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let handle = thread::Builder::new()
        .name("batchscribe-orchestrator".into())
        .spawn(move || Orchestrator::new(config, engine, token, StatusPublisher::new(tx)).run())
        .expect("failed to spawn orchestrator thread");
    (rx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use std::path::Path;

    /// Engine that must never be reached.
    struct UnreachableEngine;

    impl Engine for UnreachableEngine {
        type Model = UnreachableModel;

        fn load(&self, _spec: &ModelSpec) -> Result<UnreachableModel> {
            panic!("engine loaded for an empty run");
        }
    }

    struct UnreachableModel;

    impl EngineModel for UnreachableModel {
        fn transcribe(&mut self, _: &Path, _: &TranscribeRequest) -> Result<Transcription> {
            unreachable!()
        }
    }

    #[test]
    fn test_empty_discovery_finishes_without_loading() {
        let config = RunConfig::new("/nonexistent/media", Mode::Batch);
        let orchestrator = Orchestrator::new(
            config,
            UnreachableEngine,
            CancelToken::new(),
            StatusPublisher::disabled(),
        );

        let summary = orchestrator.run().unwrap();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.outcome, RunOutcome::Finished);
    }
}
