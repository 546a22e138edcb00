use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Mode;

/// Audio extensions accepted for transcription.
pub const AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "wav", "flac", "m4a", "ogg", "aac"];

/// Video extensions accepted for transcription.
pub const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "mkv", "avi", "mov", "webm", "flv"];

/// Classification of a discovered file, driving the timed output format
/// (SRT for video, LRC for audio).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

/// One candidate file, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub media: MediaKind,
}

/// Classify a path by extension, case-insensitively.
///
/// Returns None for anything outside the allow-lists.
pub fn classify(path: &Path) -> Option<MediaKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Audio)
    } else {
        None
    }
}

/// Discover candidate files under `root`.
///
/// `Mode::Single` yields at most one entry: `root` itself, if it is a file
/// with an allow-listed extension. `Mode::Batch` recursively enumerates the
/// tree, deduplicates, and sorts lexicographically by path so the same tree
/// always produces the same job order.
///
/// Unreadable subtrees are logged and skipped; they never abort discovery.
pub fn discover(root: &Path, mode: Mode) -> Vec<MediaFile> {
    let mut paths = match mode {
        Mode::Single => {
            if root.is_file() && classify(root).is_some() {
                vec![root.to_path_buf()]
            } else {
                Vec::new()
            }
        }
        Mode::Batch => {
            let mut found = Vec::new();
            walk(root, &mut found);
            found
        }
    };

    paths.sort();
    paths.dedup();

    let files: Vec<MediaFile> = paths
        .into_iter()
        .filter_map(|path| {
            classify(&path).map(|media| MediaFile { path, media })
        })
        .collect();

    debug!(root = %root.display(), count = files.len(), "discovery complete");
    files
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };

        let path = entry.path();
        if path.is_dir() {
            walk(&path, out);
        } else if classify(&path).is_some() {
            out.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(&path).unwrap();
        path
    }

    #[test]
    fn test_classify_audio_and_video() {
        assert_eq!(classify(Path::new("a.mp3")), Some(MediaKind::Audio));
        assert_eq!(classify(Path::new("a.flac")), Some(MediaKind::Audio));
        assert_eq!(classify(Path::new("a.mp4")), Some(MediaKind::Video));
        assert_eq!(classify(Path::new("a.mkv")), Some(MediaKind::Video));
        assert_eq!(classify(Path::new("a.pdf")), None);
        assert_eq!(classify(Path::new("noext")), None);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify(Path::new("A.MP3")), Some(MediaKind::Audio));
        assert_eq!(classify(Path::new("B.Mp4")), Some(MediaKind::Video));
    }

    #[test]
    fn test_single_mode_matching_file() {
        let tmp = TempDir::new().unwrap();
        let path = touch(tmp.path(), "song.mp3");

        let files = discover(&path, Mode::Single);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, path);
        assert_eq!(files[0].media, MediaKind::Audio);
    }

    #[test]
    fn test_single_mode_rejects_unlisted_extension() {
        let tmp = TempDir::new().unwrap();
        let path = touch(tmp.path(), "notes.txt");
        assert!(discover(&path, Mode::Single).is_empty());
    }

    #[test]
    fn test_single_mode_rejects_directory() {
        let tmp = TempDir::new().unwrap();
        assert!(discover(tmp.path(), Mode::Single).is_empty());
    }

    #[test]
    fn test_batch_mode_recursive_sorted_filtered() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "b/clip.mp4");
        touch(tmp.path(), "a/song.mp3");
        touch(tmp.path(), "a/readme.md");
        touch(tmp.path(), "z.wav");

        let files = discover(tmp.path(), Mode::Batch);
        let names: Vec<_> = files
            .iter()
            .map(|f| f.path.strip_prefix(tmp.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            names,
            vec![
                PathBuf::from("a/song.mp3"),
                PathBuf::from("b/clip.mp4"),
                PathBuf::from("z.wav"),
            ]
        );
        assert_eq!(files[1].media, MediaKind::Video);
    }

    #[test]
    fn test_batch_mode_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        for name in ["c.mp3", "a.mp3", "b/d.mp4", "b/a.ogg"] {
            touch(tmp.path(), name);
        }

        let first = discover(tmp.path(), Mode::Batch);
        let second = discover(tmp.path(), Mode::Batch);
        assert_eq!(first, second);
    }

    #[cfg(unix)]
    #[test]
    fn test_batch_mode_skips_unreadable_subtree() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "ok/song.mp3");
        let locked = tmp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        touch(&locked, "hidden.mp3");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let files = discover(tmp.path(), Mode::Batch);

        // Restore so TempDir can clean up.
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("ok/song.mp3"));
    }

    #[test]
    fn test_batch_mode_missing_root_yields_empty() {
        let files = discover(Path::new("/nonexistent/media"), Mode::Batch);
        assert!(files.is_empty());
    }
}
