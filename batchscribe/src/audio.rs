use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::error::{Error, Result};

/// Target sample rate for whisper.cpp.
pub(crate) const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Decode an audio or video file to 16kHz mono f32 samples ready for
/// whisper, using an ffmpeg subprocess. ffmpeg handles demuxing, decoding,
/// channel downmix, and resampling in one pass, so every container ffmpeg
/// knows (mp3, mp4, mkv, ...) works here.
pub(crate) fn load_samples(path: &Path) -> Result<Vec<f32>> {
    info!(path = %path.display(), "decoding audio");

    if !path.exists() {
        return Err(Error::AudioNotFound {
            path: path.to_path_buf(),
        });
    }

    let output = Command::new("ffmpeg")
        .args(["-nostdin", "-threads", "0", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "s16le",
            "-ac",
            "1",
            "-acodec",
            "pcm_s16le",
            "-ar",
            &WHISPER_SAMPLE_RATE.to_string(),
            "-",
        ])
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::AudioDecode("ffmpeg not found — install with: apt install ffmpeg".into())
            } else {
                Error::AudioDecode(format!("failed to run ffmpeg: {e}"))
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::AudioDecode(format!("ffmpeg failed: {stderr}")));
    }

    if output.stdout.is_empty() {
        return Err(Error::AudioDecode("ffmpeg produced no audio output".into()));
    }

    // s16le bytes to f32 samples in [-1.0, 1.0].
    let samples: Vec<f32> = output
        .stdout
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 32768.0)
        .collect();

    debug!(
        samples = samples.len(),
        duration_secs = format!("{:.1}", samples.len() as f64 / WHISPER_SAMPLE_RATE as f64),
        "audio decoded"
    );

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_load_samples_missing_file() {
        let err = load_samples(Path::new("/nonexistent/audio.mp3"));
        assert!(matches!(
            err,
            Err(Error::AudioNotFound { path }) if path == PathBuf::from("/nonexistent/audio.mp3")
        ));
    }
}
