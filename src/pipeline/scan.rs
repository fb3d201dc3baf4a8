//! Folder scanning: list the supported documents in the input directory.
//!
//! The walk is deliberately shallow — operators drop a folder of scans and
//! expect exactly those files processed, so recursion into subdirectories
//! would silently widen the batch. Results are sorted by file name to make
//! runs deterministic and the CSV row order reproducible.

use crate::error::ExtractError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extensions the pipeline can turn into an image.
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "pdf"];

/// The result of scanning a folder.
#[derive(Debug)]
pub struct ScanResult {
    /// Supported files, sorted by file name.
    pub files: Vec<PathBuf>,
    /// Count of directory entries skipped for an unsupported extension.
    pub skipped: usize,
}

/// True when `path` has a supported extension (case-insensitive).
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// List the supported files in `dir`.
///
/// # Errors
/// Fatal when the directory is missing, not a directory, or unreadable,
/// and when it contains no supported files — an empty batch is almost
/// always a mistyped path, and failing loudly beats writing a header-only
/// CSV.
pub fn scan_folder(dir: &Path) -> Result<ScanResult, ExtractError> {
    if !dir.exists() {
        return Err(ExtractError::InputDirNotFound {
            path: dir.to_path_buf(),
        });
    }
    if !dir.is_dir() {
        return Err(ExtractError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            ExtractError::PermissionDenied {
                path: dir.to_path_buf(),
            }
        } else {
            ExtractError::Internal(format!("read_dir failed: {e}"))
        }
    })?;

    let mut files = Vec::new();
    let mut skipped = 0usize;

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if is_supported(&path) {
            files.push(path);
        } else {
            debug!("Skipping unsupported file: {}", path.display());
            skipped += 1;
        }
    }

    if files.is_empty() {
        return Err(ExtractError::NoSupportedFiles {
            path: dir.to_path_buf(),
        });
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!(
        "Scanned {}: {} supported, {} skipped",
        dir.display(),
        files.len(),
        skipped
    );

    Ok(ScanResult { files, skipped })
}
