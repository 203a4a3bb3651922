//! Non-recursive listing of the documents to organize.

use std::path::{Path, PathBuf};

use crate::library::error::{LibraryError, LibraryResult};

/// Files directly inside `root` whose extension matches `extension`
/// (case-insensitive), sorted by name.
///
/// Directories and hidden files are skipped, so folders created by earlier
/// runs are never descended into.
pub fn list_documents(root: &Path, extension: &str) -> LibraryResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(root).map_err(|e| LibraryError::Scan {
        path: root.display().to_string(),
        source: e,
    })?;

    let wanted = extension.trim_start_matches('.');
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            !path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'))
        })
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
        })
        .collect();

    files.sort();
    Ok(files)
}

/// The raw filename of `path`, as recorded in the run log.
pub fn raw_filename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
