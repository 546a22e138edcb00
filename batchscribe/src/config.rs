use std::fmt;
use std::path::PathBuf;

/// Whisper model sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Model {
    Tiny,
    TinyEn,
    Base,
    BaseEn,
    Small,
    SmallEn,
    Medium,
    MediumEn,
    LargeV2,
    LargeV3,
    LargeV3Turbo,
    /// User-provided .bin file path.
    Custom(PathBuf),
}

impl Model {
    /// Human-readable name.
    pub fn name(&self) -> &str {
        match self {
            Model::Tiny => "tiny",
            Model::TinyEn => "tiny.en",
            Model::Base => "base",
            Model::BaseEn => "base.en",
            Model::Small => "small",
            Model::SmallEn => "small.en",
            Model::Medium => "medium",
            Model::MediumEn => "medium.en",
            Model::LargeV2 => "large-v2",
            Model::LargeV3 => "large-v3",
            Model::LargeV3Turbo => "large-v3-turbo",
            Model::Custom(_) => "custom",
        }
    }

    /// Model filename as used by HuggingFace / whisper.cpp, with an optional
    /// quantization suffix (e.g. "q5_0" gives "ggml-base-q5_0.bin").
    ///
    /// Custom models are addressed by path; the suffix does not apply.
    pub fn filename(&self, quantization: Option<&str>) -> String {
        if let Model::Custom(path) = self {
            return path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| "custom-model.bin".into());
        }

        match quantization {
            Some(q) => format!("ggml-{}-{q}.bin", self.name()),
            None => format!("ggml-{}.bin", self.name()),
        }
    }

    /// Parse from string (e.g. CLI argument).
    pub fn parse_name(s: &str) -> Option<Self> {
        match s {
            "tiny" => Some(Model::Tiny),
            "tiny.en" => Some(Model::TinyEn),
            "base" => Some(Model::Base),
            "base.en" => Some(Model::BaseEn),
            "small" => Some(Model::Small),
            "small.en" => Some(Model::SmallEn),
            "medium" => Some(Model::Medium),
            "medium.en" => Some(Model::MediumEn),
            "large-v2" => Some(Model::LargeV2),
            "large-v3" => Some(Model::LargeV3),
            "large-v3-turbo" => Some(Model::LargeV3Turbo),
            _ => None,
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Inference device for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
    Rocm,
}

impl Device {
    pub fn name(&self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
            Device::Rocm => "rocm",
        }
    }
}

/// Input selection mode: a single file, or a directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Single,
    Batch,
}

/// Parameters for one batch run.
///
/// Builder methods follow the usual pattern: start from
/// `RunConfig::new(input, mode)` and chain what you need.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub mode: Mode,
    pub model: Model,
    /// Quantization suffix for the model filename (e.g. "q5_0").
    pub quantization: Option<String>,
    pub device: Device,
    /// Compute type hint handed to the engine (e.g. "default", "int8").
    pub compute_type: String,
    /// Beam search width, minimum 1.
    pub beam_size: u32,
    pub vad_filter: bool,
    pub word_timestamps: bool,
    /// When false, a job whose timed output already exists is skipped
    /// without invoking the engine.
    pub overwrite_existing: bool,
    /// Language code, or None for auto-detection.
    pub language: Option<String>,
    pub cache_dir: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(input: impl Into<PathBuf>, mode: Mode) -> Self {
        Self {
            input: input.into(),
            mode,
            model: Model::LargeV3,
            quantization: None,
            device: Device::Cpu,
            compute_type: "default".into(),
            beam_size: 5,
            vad_filter: false,
            word_timestamps: false,
            overwrite_existing: false,
            language: None,
            cache_dir: None,
        }
    }

    pub fn model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    pub fn quantization(mut self, suffix: impl Into<String>) -> Self {
        self.quantization = Some(suffix.into());
        self
    }

    pub fn device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn compute_type(mut self, compute_type: impl Into<String>) -> Self {
        self.compute_type = compute_type.into();
        self
    }

    pub fn beam_size(mut self, size: u32) -> Self {
        self.beam_size = size.max(1);
        self
    }

    pub fn vad_filter(mut self, enabled: bool) -> Self {
        self.vad_filter = enabled;
        self
    }

    pub fn word_timestamps(mut self, enabled: bool) -> Self {
        self.word_timestamps = enabled;
        self
    }

    pub fn overwrite_existing(mut self, enabled: bool) -> Self {
        self.overwrite_existing = enabled;
        self
    }

    pub fn language(mut self, code: impl Into<String>) -> Self {
        self.language = Some(code.into());
        self
    }

    pub fn cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = Some(dir);
        self
    }

    /// Resolve the cache directory, defaulting to ~/.cache/batchscribe/models.
    pub fn resolve_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(default_cache_dir)
    }
}

/// The default model cache directory: ~/.cache/batchscribe/models.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("batchscribe")
        .join("models")
}
