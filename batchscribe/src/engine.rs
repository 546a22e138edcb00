use std::path::{Path, PathBuf};

use crate::config::{Device, Model};
use crate::error::Result;
use crate::types::Segment;

/// Everything the engine needs to materialize a model.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub model: Model,
    /// Quantization suffix for the model filename (e.g. "q5_0").
    pub quantization: Option<String>,
    pub device: Device,
    /// Compute type hint; interpretation is engine-specific.
    pub compute_type: String,
    pub cache_dir: PathBuf,
}

/// Options for a single transcription call.
#[derive(Debug, Clone)]
pub struct TranscribeRequest {
    pub beam_size: u32,
    pub vad_filter: bool,
    pub word_timestamps: bool,
    /// Language code, or None for auto-detection.
    pub language: Option<String>,
}

/// Run-level metadata the engine reports at transcription start.
#[derive(Debug, Clone, PartialEq)]
pub struct RunInfo {
    pub duration_secs: f64,
    pub language: Option<String>,
    pub language_probability: Option<f32>,
}

/// Lazily yielded segments for one file.
pub type SegmentIter = Box<dyn Iterator<Item = Result<Segment>> + Send>;

/// The result of one transcription call: metadata up front, segments
/// consumed lazily so callers can poll cancellation between segments.
pub struct Transcription {
    pub segments: SegmentIter,
    pub info: RunInfo,
}

/// A speech-to-text engine, consumed as a blocking black box.
///
/// `load` is called once per run and may take seconds to minutes (model
/// download, weight upload to an accelerator). A load failure is fatal to
/// the run; a transcription failure is scoped to a single file.
pub trait Engine {
    type Model: EngineModel;

    fn load(&self, spec: &ModelSpec) -> Result<Self::Model>;
}

/// A loaded model. `transcribe` blocks the calling thread for its full
/// duration; the orchestrator runs exactly one call at a time.
pub trait EngineModel {
    fn transcribe(&mut self, path: &Path, request: &TranscribeRequest) -> Result<Transcription>;
}
