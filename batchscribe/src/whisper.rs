use std::path::Path;

use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio;
use crate::config::Device;
use crate::engine::{Engine, EngineModel, ModelSpec, RunInfo, Transcription, TranscribeRequest};
use crate::error::{Error, Result};
use crate::model::locate_model;
use crate::types::Segment;

/// whisper.cpp implementation of the engine contract.
///
/// The model file must already be present (see `model::ensure_model`);
/// `load` fails with `ModelNotFound` rather than downloading, so the
/// blocking orchestrator thread never performs network I/O.
#[derive(Debug, Default)]
pub struct WhisperEngine;

impl WhisperEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Engine for WhisperEngine {
    type Model = WhisperModel;

    fn load(&self, spec: &ModelSpec) -> Result<WhisperModel> {
        let model_path = locate_model(&spec.model, spec.quantization.as_deref(), &spec.cache_dir)?;

        info!(
            model = %model_path.display(),
            device = spec.device.name(),
            "loading whisper model"
        );

        if spec.compute_type != "default" {
            // whisper.cpp derives precision from the model file itself;
            // the hint is recorded for parity with other engines.
            debug!(compute_type = %spec.compute_type, "compute type hint ignored by whisper.cpp");
        }

        let mut ctx_params = WhisperContextParameters::new();
        ctx_params.use_gpu(spec.device != Device::Cpu);
        ctx_params.gpu_device(0);

        let ctx = WhisperContext::new_with_params(
            model_path
                .to_str()
                .ok_or_else(|| Error::Model("model path contains invalid UTF-8".into()))?,
            ctx_params,
        )?;

        Ok(WhisperModel { ctx })
    }
}

/// A loaded whisper.cpp context, reused across every file in a run.
pub struct WhisperModel {
    ctx: WhisperContext,
}

impl EngineModel for WhisperModel {
    fn transcribe(&mut self, path: &Path, request: &TranscribeRequest) -> Result<Transcription> {
        let samples = audio::load_samples(path)?;
        let duration_secs = samples.len() as f64 / audio::WHISPER_SAMPLE_RATE as f64;

        let mut state = self.ctx.create_state()?;

        let mut params = FullParams::new(SamplingStrategy::BeamSearch {
            beam_size: request.beam_size.max(1) as i32,
            patience: -1.0,
        });

        match request.language.as_deref() {
            Some(code) => params.set_language(Some(code)),
            None => params.set_detect_language(true),
        }

        params.set_token_timestamps(request.word_timestamps);
        if request.vad_filter {
            params.enable_vad(true);
        }

        // Keep whisper.cpp off stderr; callers own the output streams.
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        info!(path = %path.display(), samples = samples.len(), "running transcription");
        state.full(params, &samples)?;

        let num_segments = state.full_n_segments();
        debug!(num_segments, "transcription complete");

        let mut segments = Vec::with_capacity(num_segments as usize);
        for i in 0..num_segments {
            let segment = state
                .get_segment(i)
                .ok_or_else(|| Error::Transcription(format!("segment {i} not found")))?;

            let text = segment
                .to_str_lossy()
                .map_err(|e| Error::Transcription(format!("segment text error: {e}")))?
                .into_owned();

            segments.push(Segment {
                start: segment.start_timestamp() as f64 / 100.0,
                end: segment.end_timestamp() as f64 / 100.0,
                text,
            });
        }

        let detected_lang_id = state.full_lang_id_from_state();
        let language = whisper_rs::get_lang_str(detected_lang_id).map(str::to_owned);

        Ok(Transcription {
            segments: Box::new(segments.into_iter().map(Ok)),
            info: RunInfo {
                duration_secs,
                language,
                // whisper.cpp does not surface a detection probability.
                language_probability: None,
            },
        })
    }
}
