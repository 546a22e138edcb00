//! Batch audio/video transcription — file or directory in, subtitles and lyrics out.
//!
//! **batchscribe** discovers every supported media file under an input path,
//! sequences them one at a time through a whisper.cpp engine, and writes a
//! plain-text transcript plus a timed output (SRT for video, LRC for audio)
//! beside each source. The orchestrator runs on a background thread,
//! publishes job status, per-file progress, and batch ETA over a channel,
//! and honors a two-level cooperative stop: the first request lets the
//! current file finish, the second aborts mid-file.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use batchscribe::{run_in_background, CancelToken, Mode, RunConfig, RunEvent, WhisperEngine};
//!
//! let config = RunConfig::new("/media/podcasts", Mode::Batch);
//! let token = CancelToken::new();
//! let (events, handle) = run_in_background(config, WhisperEngine::new(), token.clone());
//!
//! for event in events {
//!     if let RunEvent::RunFinished(summary) = event {
//!         println!("{} of {} files transcribed", summary.completed, summary.total);
//!     }
//! }
//! # handle.join().unwrap().unwrap();
//! ```

pub(crate) mod audio;
pub mod cancel;
pub mod config;
pub mod discover;
pub mod engine;
pub mod error;
pub mod events;
pub mod job;
pub mod model;
pub mod orchestrator;
pub mod outputs;
pub mod types;
pub mod whisper;

pub use cancel::{CancelState, CancelToken};
pub use config::{Device, Mode, Model, RunConfig};
pub use discover::{MediaFile, MediaKind};
pub use engine::{
    Engine, EngineModel, ModelSpec, RunInfo, SegmentIter, Transcription, TranscribeRequest,
};
pub use error::{Error, Result};
pub use events::{RunEvent, RunOutcome, RunSummary, StatusPublisher};
pub use job::{BatchRun, Job, JobStatus};
pub use orchestrator::{run_in_background, Orchestrator};
pub use types::Segment;
pub use whisper::{WhisperEngine, WhisperModel};
