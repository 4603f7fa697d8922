use crate::error::ScanError;
use crate::types::AudioFile;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Extensions picked up when the config does not override them.
pub const AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "flac", "m4a", "aac", "ogg", "wma"];

pub fn default_extensions() -> Vec<String> {
    AUDIO_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

/// Case-insensitive extension match; a leading dot in `extensions` is ignored.
pub fn is_audio_file(p: &Path, extensions: &[String]) -> bool {
    let ext = p
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    if ext.is_empty() {
        return false;
    }
    extensions
        .iter()
        .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&ext))
}

fn resolve_root(root: &Path) -> Result<PathBuf, ScanError> {
    if !root.exists() {
        return Err(ScanError::PathNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    std::path::absolute(root).map_err(|source| ScanError::Resolve {
        path: root.to_path_buf(),
        source,
    })
}

/// Recursively lists audio files under `root`, sorted by file name within
/// each directory. Any walk error aborts the scan.
pub fn scan_directory(root: &Path, extensions: &[String]) -> Result<Vec<AudioFile>, ScanError> {
    let root = resolve_root(root)?;
    let mut files = Vec::new();

    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry.map_err(|source| ScanError::Walk {
            root: root.clone(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.into_path();
        if !is_audio_file(&path, extensions) {
            debug!(file = %path.display(), "skipped: not an audio extension");
            continue;
        }

        let rel_path = path
            .strip_prefix(&root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.file_name().map(PathBuf::from).unwrap_or_default());
        files.push(AudioFile { path, rel_path });
    }

    info!(root = %root.display(), count = files.len(), "scan finished");
    Ok(files)
}
