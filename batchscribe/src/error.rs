use std::path::PathBuf;

/// All errors that can occur in batchscribe.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("discovery error: {0}")]
    Discovery(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("model not found: {path}")]
    ModelNotFound { path: PathBuf },

    #[cfg(feature = "download")]
    #[error("model download failed: {0}")]
    ModelDownload(String),

    #[error("unknown model: \"{0}\" — use Model::parse_name with a known size name or a .bin path")]
    UnknownModel(String),

    #[error("audio decoding error: {0}")]
    AudioDecode(String),

    #[error("audio file not found: {path}")]
    AudioNotFound { path: PathBuf },

    #[error("transcription error: {0}")]
    Transcription(String),

    #[error("whisper error: {0}")]
    Whisper(#[from] whisper_rs::WhisperError),

    /// A cancellation checkpoint tripped mid-file. Not an engine failure:
    /// the in-flight job is abandoned and the run loop terminates.
    #[error("run interrupted")]
    Interrupted,

    #[error("failed to write {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "download")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_model_not_found() {
        let e = Error::ModelNotFound {
            path: PathBuf::from("/tmp/ggml-base.bin"),
        };
        assert!(e.to_string().contains("/tmp/ggml-base.bin"));
    }

    #[test]
    fn test_error_display_unknown_model() {
        let e = Error::UnknownModel("gigantic".into());
        assert!(e.to_string().contains("gigantic"));
    }

    #[test]
    fn test_error_display_interrupted() {
        assert_eq!(Error::Interrupted.to_string(), "run interrupted");
    }

    #[test]
    fn test_error_display_output_write() {
        let e = Error::OutputWrite {
            path: PathBuf::from("/tmp/a.srt"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = e.to_string();
        assert!(msg.contains("/tmp/a.srt"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("file not found"));
    }
}
