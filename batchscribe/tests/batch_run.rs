//! Behavioural tests for the batch orchestrator, driven by a scripted
//! engine so no model or ffmpeg is needed.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};

use tempfile::TempDir;

use batchscribe::{
    CancelToken, Engine, EngineModel, Error, JobStatus, Mode, ModelSpec, Orchestrator, Result,
    RunConfig, RunEvent, RunInfo, RunOutcome, RunSummary, Segment, StatusPublisher,
    Transcription, TranscribeRequest, run_in_background,
};

/// Shared script for the mock engine: which loads fail, which files fail,
/// and when to signal the cancel token mid-transcription.
#[derive(Clone)]
struct Script {
    fail_load: bool,
    fail_substrings: Vec<&'static str>,
    /// (0-based transcribe call index, number of stop escalations to fire
    /// during that call).
    stop_at_call: Option<(usize, u8)>,
    token: CancelToken,
    calls: Arc<AtomicUsize>,
}

impl Script {
    fn new(token: CancelToken) -> Self {
        Self {
            fail_load: false,
            fail_substrings: Vec::new(),
            stop_at_call: None,
            token,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

struct MockEngine {
    script: Script,
}

impl Engine for MockEngine {
    type Model = MockModel;

    fn load(&self, _spec: &ModelSpec) -> Result<MockModel> {
        if self.script.fail_load {
            return Err(Error::Model("weights corrupt".into()));
        }
        Ok(MockModel {
            script: self.script.clone(),
        })
    }
}

struct MockModel {
    script: Script,
}

impl EngineModel for MockModel {
    fn transcribe(&mut self, path: &Path, _request: &TranscribeRequest) -> Result<Transcription> {
        let call = self.script.calls.fetch_add(1, Ordering::SeqCst);

        // Simulates a stop request arriving while this file is in flight.
        if let Some((at, escalations)) = self.script.stop_at_call {
            if call == at {
                for _ in 0..escalations {
                    self.script.token.request_stop();
                }
            }
        }

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        if self.script.fail_substrings.iter().any(|s| name.contains(*s)) {
            return Err(Error::Transcription(format!("decode failed for {name}")));
        }

        let segments = vec![
            Segment::new(0.0, 2.0, format!("hello from {name}")),
            Segment::new(2.0, 4.0, "and goodbye"),
        ];
        Ok(Transcription {
            segments: Box::new(segments.into_iter().map(Ok)),
            info: RunInfo {
                duration_secs: 4.0,
                language: Some("en".into()),
                language_probability: None,
            },
        })
    }
}

fn media_tree(names: &[&str]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for name in names {
        fs::write(tmp.path().join(name), b"").unwrap();
    }
    tmp
}

fn run_sync(
    config: RunConfig,
    script: Script,
) -> (Result<RunSummary>, Vec<RunEvent>) {
    let token = script.token.clone();
    let (tx, rx) = mpsc::channel();
    let orchestrator = Orchestrator::new(
        config,
        MockEngine { script },
        token,
        StatusPublisher::new(tx),
    );
    let result = orchestrator.run();
    let events = rx.try_iter().collect();
    (result, events)
}

fn statuses_for(events: &[RunEvent], name: &str) -> Vec<JobStatus> {
    events
        .iter()
        .filter_map(|e| match e {
            RunEvent::JobStatusChanged { path, status } if path.ends_with(name) => Some(*status),
            _ => None,
        })
        .collect()
}

fn progress_for(events: &[RunEvent], name: &str) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            RunEvent::JobProgressChanged { path, percent } if path.ends_with(name) => {
                Some(*percent)
            }
            _ => None,
        })
        .collect()
}

#[test]
fn full_batch_completes_and_writes_outputs() {
    let tmp = media_tree(&["a.mp3", "b.mp4", "c.wav"]);
    let script = Script::new(CancelToken::new());
    let calls = script.calls.clone();

    let (result, events) = run_sync(RunConfig::new(tmp.path(), Mode::Batch), script);
    let summary = result.unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.completed, 3);
    assert_eq!(summary.errored, 0);
    assert_eq!(summary.outcome, RunOutcome::Finished);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    assert_eq!(
        statuses_for(&events, "a.mp3"),
        vec![JobStatus::Processing, JobStatus::Completed]
    );

    // Audio gets LRC, video gets SRT, everything gets TXT.
    assert_eq!(
        fs::read_to_string(tmp.path().join("a.lrc")).unwrap(),
        "[00:00.00]hello from a.mp3\n[00:02.00]and goodbye\n"
    );
    assert_eq!(
        fs::read_to_string(tmp.path().join("b.srt")).unwrap(),
        "1\n00:00:00,000 --> 00:00:02,000\nhello from b.mp4\n\n\
         2\n00:00:02,000 --> 00:00:04,000\nand goodbye\n\n"
    );
    assert_eq!(
        fs::read_to_string(tmp.path().join("c.txt")).unwrap(),
        "hello from c.wav\nand goodbye\n"
    );

    // The stream starts with the batch totals and ends with the summary.
    assert!(matches!(
        events.first(),
        Some(RunEvent::BatchProgressChanged {
            processed: 0,
            total: 3,
            eta_secs: None
        })
    ));
    assert!(matches!(events.last(), Some(RunEvent::RunFinished(_))));
}

#[test]
fn single_mode_processes_exactly_one_file() {
    let tmp = media_tree(&["solo.mp3", "other.mp3"]);
    let script = Script::new(CancelToken::new());
    let calls = script.calls.clone();

    let (result, _events) = run_sync(
        RunConfig::new(tmp.path().join("solo.mp3"), Mode::Single),
        script,
    );

    assert_eq!(result.unwrap().completed, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(tmp.path().join("solo.lrc").exists());
    assert!(!tmp.path().join("other.lrc").exists());
}

#[test]
fn existing_timed_output_skips_without_engine_call() {
    let tmp = media_tree(&["a.mp3", "b.mp3", "c.mp3"]);
    fs::write(tmp.path().join("b.lrc"), b"old lyrics").unwrap();

    let script = Script::new(CancelToken::new());
    let calls = script.calls.clone();

    let (result, events) = run_sync(RunConfig::new(tmp.path(), Mode::Batch), script);
    let summary = result.unwrap();

    assert_eq!(summary.completed, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // Straight Pending -> Skipped, never Processing.
    assert_eq!(statuses_for(&events, "b.mp3"), vec![JobStatus::Skipped]);
    // The stale file is left untouched.
    assert_eq!(
        fs::read_to_string(tmp.path().join("b.lrc")).unwrap(),
        "old lyrics"
    );
}

#[test]
fn overwrite_mode_reprocesses_existing_outputs() {
    let tmp = media_tree(&["a.mp3"]);
    fs::write(tmp.path().join("a.lrc"), b"old lyrics").unwrap();

    let script = Script::new(CancelToken::new());
    let config = RunConfig::new(tmp.path(), Mode::Batch).overwrite_existing(true);
    let (result, _events) = run_sync(config, script);

    assert_eq!(result.unwrap().completed, 1);
    assert!(fs::read_to_string(tmp.path().join("a.lrc"))
        .unwrap()
        .starts_with("[00:00.00]"));
}

#[test]
fn transcribe_failure_is_scoped_to_one_job() {
    let tmp = media_tree(&["a.mp3", "bad.mp3", "c.mp3"]);
    let mut script = Script::new(CancelToken::new());
    script.fail_substrings.push("bad");
    let calls = script.calls.clone();

    let (result, events) = run_sync(RunConfig::new(tmp.path(), Mode::Batch), script);
    let summary = result.unwrap();

    // The loop moved on past the failure.
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.errored, 1);
    assert_eq!(summary.outcome, RunOutcome::Finished);
    assert_eq!(
        statuses_for(&events, "bad.mp3"),
        vec![JobStatus::Processing, JobStatus::Error]
    );
    assert!(!tmp.path().join("bad.lrc").exists());
    assert!(tmp.path().join("c.lrc").exists());
}

#[test]
fn load_failure_aborts_before_any_job() {
    let tmp = media_tree(&["a.mp3", "b.mp3"]);
    let mut script = Script::new(CancelToken::new());
    script.fail_load = true;
    let calls = script.calls.clone();

    let (result, events) = run_sync(RunConfig::new(tmp.path(), Mode::Batch), script);

    assert!(matches!(result, Err(Error::Model(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // No job was ever touched, but the summary still goes out.
    assert!(events
        .iter()
        .all(|e| !matches!(e, RunEvent::JobStatusChanged { .. })));
    match events.last() {
        Some(RunEvent::RunFinished(summary)) => {
            assert_eq!(summary.outcome, RunOutcome::LoadFailed);
            assert_eq!(summary.completed, 0);
        }
        other => panic!("expected RunFinished, got {other:?}"),
    }
}

#[test]
fn single_stop_lets_current_job_finish() {
    let tmp = media_tree(&["01.mp3", "02.mp3", "03.mp3", "04.mp3", "05.mp3"]);
    let mut script = Script::new(CancelToken::new());
    // One stop request while job 2 is mid-transcription.
    script.stop_at_call = Some((1, 1));

    let (result, events) = run_sync(RunConfig::new(tmp.path(), Mode::Batch), script);
    let summary = result.unwrap();

    assert_eq!(summary.total, 5);
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.errored, 0);
    assert_eq!(summary.outcome, RunOutcome::StoppedAfterCurrent);

    // Job 2 ran to completion, outputs included.
    assert_eq!(
        statuses_for(&events, "02.mp3"),
        vec![JobStatus::Processing, JobStatus::Completed]
    );
    assert!(tmp.path().join("02.lrc").exists());

    // Jobs 3-5 were never touched.
    for name in ["03.mp3", "04.mp3", "05.mp3"] {
        assert!(statuses_for(&events, name).is_empty());
        assert!(!tmp.path().join(name).with_extension("lrc").exists());
    }
}

#[test]
fn double_stop_aborts_midfile_without_partial_outputs() {
    let tmp = media_tree(&["01.mp3", "02.mp3", "03.mp3", "04.mp3", "05.mp3"]);
    let mut script = Script::new(CancelToken::new());
    // Two escalations while job 2 is mid-transcription.
    script.stop_at_call = Some((1, 2));

    let (result, events) = run_sync(RunConfig::new(tmp.path(), Mode::Batch), script);
    let summary = result.unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.errored, 1);
    assert_eq!(summary.outcome, RunOutcome::Cancelled);

    // The interrupted job is marked Error and left no files behind.
    assert_eq!(
        statuses_for(&events, "02.mp3"),
        vec![JobStatus::Processing, JobStatus::Error]
    );
    assert!(!tmp.path().join("02.lrc").exists());
    assert!(!tmp.path().join("02.txt").exists());

    for name in ["03.mp3", "04.mp3", "05.mp3"] {
        assert!(statuses_for(&events, name).is_empty());
    }
}

#[test]
fn job_progress_is_monotone_and_bounded() {
    let tmp = media_tree(&["a.mp3"]);
    let script = Script::new(CancelToken::new());

    let (_result, events) = run_sync(RunConfig::new(tmp.path(), Mode::Batch), script);
    let percents = progress_for(&events, "a.mp3");

    // 2s and 4s segment ends over a 4s file, then the completion snap.
    assert_eq!(percents, vec![50.0, 100.0, 100.0]);
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert!(percents.iter().all(|p| (0.0..=100.0).contains(p)));
}

#[test]
fn eta_becomes_known_after_first_processed_job() {
    let tmp = media_tree(&["a.mp3", "b.mp3"]);
    let script = Script::new(CancelToken::new());

    let (_result, events) = run_sync(RunConfig::new(tmp.path(), Mode::Batch), script);

    let etas: Vec<Option<f64>> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::BatchProgressChanged { eta_secs, .. } => Some(*eta_secs),
            _ => None,
        })
        .collect();

    assert_eq!(etas.first(), Some(&None));
    // After the first completion every estimate is a real number >= 0.
    assert!(etas[1..].iter().all(|eta| eta.is_some_and(|s| s >= 0.0)));
    // Nothing left once both files are done.
    assert_eq!(etas.last(), Some(&Some(0.0)));
}

#[test]
fn background_run_streams_events_then_joins() {
    let tmp = media_tree(&["a.mp3", "b.mp4"]);
    let token = CancelToken::new();
    let script = Script::new(token.clone());

    let (events, handle) = run_in_background(
        RunConfig::new(tmp.path(), Mode::Batch),
        MockEngine { script },
        token,
    );

    let collected: Vec<RunEvent> = events.iter().collect();
    let summary = handle.join().unwrap().unwrap();

    assert_eq!(summary.completed, 2);
    match collected.last() {
        Some(RunEvent::RunFinished(last)) => assert_eq!(*last, summary),
        other => panic!("expected RunFinished, got {other:?}"),
    }
}
