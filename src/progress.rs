//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! real-time events as the batch processes each document.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a channel, a database record, or a terminal progress bar
//! without the library knowing anything about how the host application
//! communicates. The trait is `Send + Sync` so an implementation can be shared
//! freely even though the batch itself processes files sequentially.

use std::sync::Arc;

/// Called by the batch pipeline as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Files are processed strictly sequentially, so the
/// per-file methods are never called concurrently.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after scanning, before any file is processed.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called just before a file enters the pipeline.
    fn on_file_start(&self, file_num: usize, total_files: usize, filename: &str) {
        let _ = (file_num, total_files, filename);
    }

    /// Called when a file produced a CSV row.
    ///
    /// `fields_found` is the number of non-empty fields extracted, useful
    /// for spotting documents the model could barely read.
    fn on_file_complete(
        &self,
        file_num: usize,
        total_files: usize,
        filename: &str,
        fields_found: usize,
    ) {
        let _ = (file_num, total_files, filename, fields_found);
    }

    /// Called when a file failed after all retries.
    fn on_file_error(&self, file_num: usize, total_files: usize, filename: &str, error: &str) {
        let _ = (file_num, total_files, filename, error);
    }

    /// Called once after all files have been attempted.
    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
