//! Output types: per-file results and batch statistics.

use crate::error::FileError;
use crate::fields::DocumentFields;
use serde::{Deserialize, Serialize};

/// The outcome of processing one document.
///
/// Always produced, even on failure — `error` is `Some` and `fields` is
/// `None` (or partially filled when salvage recovered some keys) so callers
/// can inspect partial success per file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResult {
    /// File name (no directory component), as it appears in the CSV.
    pub filename: String,

    /// Extracted fields; `None` when the file failed before salvage.
    pub fields: Option<DocumentFields>,

    /// The model's raw reply, kept only when salvage failed so the operator
    /// can see what came back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,

    /// Tokens billed for this document.
    pub input_tokens: u32,
    pub output_tokens: u32,

    /// Wall-clock time for the whole per-file pipeline.
    pub duration_ms: u64,

    /// API retry attempts that were needed (0 = first try succeeded).
    pub retries: u32,

    /// The failure, when the file did not extract cleanly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FileError>,
}

impl FileResult {
    /// True when the document produced a usable row.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.fields.is_some()
    }
}

/// Aggregate statistics for one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Supported files found in the folder.
    pub total_files: usize,
    /// Files that produced a CSV row.
    pub processed_files: usize,
    /// Files that failed after all retries.
    pub failed_files: usize,
    /// Directory entries skipped for an unsupported extension.
    pub skipped_files: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    /// Wall-clock time for the whole batch.
    pub total_duration_ms: u64,
    /// Cumulative per-file pipeline time (decode through salvage,
    /// including API retries).
    pub file_duration_ms: u64,
}

/// Everything a batch run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    /// Per-file outcomes, in processing (sorted-filename) order.
    pub results: Vec<FileResult>,
    pub stats: BatchStats,
}
