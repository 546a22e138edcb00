use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::discover::MediaKind;
use crate::error::{Error, Result};
use crate::types::Segment;

/// Extension of the timed output for a media kind: subtitles for video,
/// synchronized lyrics for audio.
pub fn timed_extension(media: MediaKind) -> &'static str {
    match media {
        MediaKind::Video => "srt",
        MediaKind::Audio => "lrc",
    }
}

/// Expected timed-output path: the source path with its extension swapped.
pub fn timed_output_path(source: &Path, media: MediaKind) -> PathBuf {
    source.with_extension(timed_extension(media))
}

/// Expected plain-text output path.
pub fn text_output_path(source: &Path) -> PathBuf {
    source.with_extension("txt")
}

/// Pre-flight skip decision: with overwriting disabled and the timed
/// output already on disk, the job never reaches the engine.
pub fn should_skip(source: &Path, media: MediaKind, overwrite_existing: bool) -> bool {
    !overwrite_existing && timed_output_path(source, media).exists()
}

/// Segment texts, trimmed and newline-joined.
pub fn render_txt(segments: &[Segment]) -> String {
    let mut out = segments
        .iter()
        .map(|s| s.text.trim())
        .collect::<Vec<_>>()
        .join("\n");
    out.push('\n');
    out
}

/// SubRip: 1-indexed blocks with `HH:MM:SS,mmm` timestamps. Literal `-->`
/// in segment text would corrupt the block structure, so it is rewritten.
pub fn render_srt(segments: &[Segment]) -> String {
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        out.push_str(&format!("{}\n", i + 1));
        out.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(seg.start),
            format_srt_time(seg.end)
        ));
        out.push_str(&seg.text.trim().replace("-->", "->"));
        out.push_str("\n\n");
    }
    out
}

/// LRC lyrics: one `[MM:SS.cc]text` line per segment. Segments whose text
/// trims to empty produce no line at all.
pub fn render_lrc(segments: &[Segment]) -> String {
    let mut out = String::new();
    for seg in segments {
        let text = seg.text.trim();
        if text.is_empty() {
            continue;
        }
        out.push_str(&format!("[{}]{}\n", format_lrc_time(seg.start), text));
    }
    out
}

/// Format seconds as SRT timestamp: HH:MM:SS,mmm
fn format_srt_time(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0) as u64;
    let h = total_ms / 3_600_000;
    let m = (total_ms % 3_600_000) / 60_000;
    let s = (total_ms % 60_000) / 1_000;
    let ms = total_ms % 1_000;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

/// Format seconds as LRC timestamp: MM:SS.cc (centiseconds)
fn format_lrc_time(seconds: f64) -> String {
    let total_cs = (seconds * 100.0) as u64;
    let m = total_cs / 6_000;
    let s = (total_cs % 6_000) / 100;
    let cs = total_cs % 100;
    format!("{m:02}:{s:02}.{cs:02}")
}

/// Paths written for one completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenOutputs {
    pub text: PathBuf,
    pub timed: PathBuf,
}

/// Write the TXT and the media-appropriate timed file beside the source.
///
/// Both writes are always attempted; the job only counts as completed when
/// both succeed. On partial failure the surviving file is left in place,
/// logged, and the first error is returned.
pub fn write_outputs(
    source: &Path,
    media: MediaKind,
    segments: &[Segment],
) -> Result<WrittenOutputs> {
    let text_path = text_output_path(source);
    let timed_path = timed_output_path(source, media);

    let text_res = write_file(&text_path, &render_txt(segments));

    let timed_content = match media {
        MediaKind::Video => render_srt(segments),
        MediaKind::Audio => render_lrc(segments),
    };
    let timed_res = write_file(&timed_path, &timed_content);

    match (text_res, timed_res) {
        (Ok(()), Ok(())) => {
            debug!(
                text = %text_path.display(),
                timed = %timed_path.display(),
                "outputs written"
            );
            Ok(WrittenOutputs {
                text: text_path,
                timed: timed_path,
            })
        }
        (Err(e), Ok(())) => {
            warn!(path = %timed_path.display(), "timed output written but text output failed");
            Err(e)
        }
        (Ok(()), Err(e)) => {
            warn!(path = %text_path.display(), "text output written but timed output failed");
            Err(e)
        }
        (Err(e), Err(_)) => Err(e),
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|source| Error::OutputWrite {
        path: path.to_path_buf(),
        source,
    })
}
