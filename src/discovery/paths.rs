use ignore::WalkBuilder;
use log::{debug, warn};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};

use crate::core::error::{LinkSentryError, Result};

/// Turn file and directory arguments into the list of files to scan.
///
/// Files are kept as given. Directories are walked recursively, honouring
/// `.gitignore` and skipping hidden entries and `~` temp files. Inside a
/// directory only files whose extension is in `file_types` are kept; without
/// a filter every file that has an extension is kept.
pub fn expand_paths<P: AsRef<Path>>(
    paths: &[P],
    file_types: Option<&[String]>,
) -> Result<Vec<PathBuf>> {
    let extensions: Option<FxHashSet<&str>> =
        file_types.map(|types| types.iter().map(String::as_str).collect());
    let mut result_paths = Vec::new();

    for path in paths {
        let path = path.as_ref();
        if path.is_file() {
            result_paths.push(path.to_path_buf());
        } else if path.is_dir() {
            let before = result_paths.len();
            walk_directory(path, extensions.as_ref(), &mut result_paths);
            debug!(
                "Found {} file(s) under {}",
                result_paths.len() - before,
                path.display()
            );
        } else {
            return Err(LinkSentryError::InvalidArgument(format!(
                "File not found: '{}'",
                path.display()
            )));
        }
    }

    Ok(result_paths)
}

fn walk_directory(dir: &Path, extensions: Option<&FxHashSet<&str>>, out: &mut Vec<PathBuf>) {
    let mut builder = WalkBuilder::new(dir);
    builder
        .require_git(false)
        .sort_by_file_name(|a, b| a.cmp(b));

    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry under {}: {err}", dir.display());
                continue;
            }
        };
        if !entry.file_type().is_some_and(|file_type| file_type.is_file()) {
            continue;
        }
        if wanted(entry.path(), extensions) {
            out.push(entry.into_path());
        }
    }
}

fn wanted(path: &Path, extensions: Option<&FxHashSet<&str>>) -> bool {
    let temp_file = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('~'));
    if temp_file {
        return false;
    }

    match (path.extension().and_then(|ext| ext.to_str()), extensions) {
        (Some(ext), Some(extensions)) => extensions.contains(ext),
        (None, Some(extensions)) => extensions.contains(""),
        (Some(_), None) => true,
        (None, None) => false,
    }
}
