use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::audio::is_supported_audio;

mod pipeline;
mod tags;

pub(crate) use pipeline::run as run_pipeline;
pub(crate) use tags::read_tags;

/// Recursively collect supported audio files under `root`, sorted by path.
///
/// Unreadable subdirectories and entries are logged and skipped; only a
/// failure to read the root itself is an error. Symlinks are not followed.
pub(crate) fn collect_supported_files(root: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(source) if dir != root => {
                warn!(dir = %dir.display(), error = %source, "Skipping unreadable directory");
                continue;
            }
            Err(source) => return Err(source),
        };
        for entry_result in entries {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(dir = %dir.display(), error = %err, "Skipping unreadable entry");
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Skipping entry without file type");
                    continue;
                }
            };
            if file_type.is_symlink() {
                continue;
            }
            if file_type.is_dir() {
                stack.push(path);
                continue;
            }
            if file_type.is_file() && is_supported_audio(&path) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
