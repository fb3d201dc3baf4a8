//! Error types for the id2csv library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`] — **Fatal**: the batch cannot proceed at all
//!   (missing input folder, no API key, unwritable output). Returned as
//!   `Err(ExtractError)` from the top-level `extract_*` functions.
//!
//! * [`FileError`] — **Non-fatal**: a single document failed (decode glitch,
//!   transient API error, unparseable reply) but every other file is fine.
//!   Stored inside [`crate::output::FileResult`] so callers can inspect
//!   partial success rather than losing the whole folder to one bad scan.
//!
//! The separation lets callers decide their own tolerance: abort on the first
//! file failure, log and continue, or collect all errors for a post-run report.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the id2csv library.
///
/// Per-file failures use [`FileError`] and are stored in
/// [`crate::output::FileResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input folder was not found at the given path.
    #[error("Input folder not found: '{path}'\nCheck the path exists and is readable.")]
    InputDirNotFound { path: PathBuf },

    /// The input path exists but is not a directory.
    #[error("Input path is not a directory: '{path}'")]
    NotADirectory { path: PathBuf },

    /// Process does not have read permission on the input folder.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The folder contained no files with a supported extension.
    #[error(
        "No supported files in '{path}'\n\
         Supported extensions: .png .jpg .jpeg .webp .pdf"
    )]
    NoSupportedFiles { path: PathBuf },

    // ── Provider errors ───────────────────────────────────────────────────
    /// No API key available and no provider injected.
    #[error(
        "ANTHROPIC_API_KEY environment variable is not set.\n\
         Export it or inject a provider via ExtractionConfig::builder().provider(...)."
    )]
    ApiKeyMissing,

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    HttpClientFailed(String),

    /// Every file failed; the CSV would be empty.
    #[error("All {total} files failed.\nFirst error: {first_error}")]
    AllFilesFailed { total: usize, first_error: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output CSV file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document.
///
/// Stored on [`crate::output::FileResult`] when a file fails.
/// The overall batch continues unless ALL files fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    /// The file has no supported extension.
    #[error("'{filename}': unsupported file type '.{extension}'")]
    UnsupportedType { filename: String, extension: String },

    /// The image bytes could not be decoded.
    #[error("'{filename}': image decode failed: {detail}")]
    DecodeFailed { filename: String, detail: String },

    /// The PDF could not be opened or its first page could not be rasterised.
    #[error("'{filename}': PDF rasterisation failed: {detail}")]
    PdfRenderFailed { filename: String, detail: String },

    /// JPEG compression could not fit the image under the byte limit
    /// even at the minimum quality.
    #[error(
        "'{filename}': could not compress under {max_bytes} bytes \
         (quality floor reached)"
    )]
    CompressionFailed { filename: String, max_bytes: usize },

    /// The vision API call failed after all retries.
    #[error("'{filename}': API call failed after {retries} retries: {detail}")]
    ApiFailed {
        filename: String,
        retries: u32,
        detail: String,
    },

    /// The vision API call timed out.
    #[error("'{filename}': API call timed out after {secs}s")]
    Timeout { filename: String, secs: u64 },

    /// The model replied, but no JSON object could be recovered from the text.
    #[error("'{filename}': no JSON object found in model reply: {detail}")]
    ResponseNotJson { filename: String, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_files_failed_display() {
        let e = ExtractError::AllFilesFailed {
            total: 7,
            first_error: "decode failed".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("All 7 files failed"), "got: {msg}");
        assert!(msg.contains("decode failed"));
    }

    #[test]
    fn no_supported_files_mentions_extensions() {
        let e = ExtractError::NoSupportedFiles {
            path: PathBuf::from("/tmp/empty"),
        };
        assert!(e.to_string().contains(".webp"));
    }

    #[test]
    fn api_failed_display() {
        let e = FileError::ApiFailed {
            filename: "passport_01.jpg".into(),
            retries: 3,
            detail: "HTTP 529".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("passport_01.jpg"));
        assert!(msg.contains("3 retries"));
        assert!(msg.contains("HTTP 529"));
    }

    #[test]
    fn compression_failed_display() {
        let e = FileError::CompressionFailed {
            filename: "big.png".into(),
            max_bytes: 5 * 1024 * 1024,
        };
        assert!(e.to_string().contains("5242880"));
    }

    #[test]
    fn file_error_round_trips_through_serde() {
        let e = FileError::ResponseNotJson {
            filename: "id.jpg".into(),
            detail: "no braces".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: FileError = serde_json::from_str(&json).unwrap();
        assert!(back.to_string().contains("id.jpg"));
    }
}
