//! Batch orchestration: the top-level extraction entry points.
//!
//! [`extract_folder`] drives the whole pipeline: scan the folder, then for
//! each file load → normalize → encode → call the vision provider (with
//! retry/backoff) → salvage the JSON → record the result → rewrite the CSV.
//!
//! ## Why sequential?
//!
//! Files are processed strictly one at a time. Identity-document batches are
//! small (tens, not thousands of files), the per-file latency is dominated by
//! a single API round-trip, and sequential processing keeps the incremental
//! CSV save trivially consistent: after file N is done, the CSV holds exactly
//! the rows for files 1..=N.
//!
//! ## Error isolation
//!
//! A per-file failure is logged and recorded on its [`FileResult`]; the batch
//! moves on. Only unusable input, a missing API key, an unwritable CSV, or
//! every single file failing aborts the run.

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, FileError};
use crate::fields::DocumentFields;
use crate::output::{BatchOutput, BatchStats, FileResult};
use crate::pipeline::{csv, encode, load, normalize, salvage, scan};
use crate::prompts::DEFAULT_EXTRACTION_PROMPT;
use crate::provider::{AnthropicProvider, VisionProvider, VisionResponse};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Extract fields from every supported document in `input_dir`, writing
/// `csv_path` incrementally.
///
/// # Returns
/// `Ok(BatchOutput)` on success, even if some files failed
/// (check `output.stats.failed_files`).
///
/// # Errors
/// Returns `Err(ExtractError)` only for fatal conditions:
/// - input folder missing, not a directory, or without supported files
/// - no API key and no injected provider
/// - the CSV cannot be written
/// - every file failed
pub async fn extract_folder(
    input_dir: impl AsRef<Path>,
    csv_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<BatchOutput, ExtractError> {
    let total_start = Instant::now();
    let input_dir = input_dir.as_ref();
    let csv_path = csv_path.as_ref();
    info!("Starting extraction: {}", input_dir.display());

    // ── Step 1: Scan the folder ──────────────────────────────────────────
    let scanned = scan::scan_folder(input_dir)?;
    let total_files = scanned.files.len();
    info!("Found {} supported files ({} skipped)", total_files, scanned.skipped);

    // ── Step 2: Resolve the provider ─────────────────────────────────────
    // Before any image work: a missing API key should fail in milliseconds,
    // not after decoding half the folder.
    let provider = resolve_provider(config)?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total_files);
    }

    // ── Step 3: Process files sequentially ───────────────────────────────
    let mut results: Vec<FileResult> = Vec::with_capacity(total_files);
    let mut file_duration_ms = 0u64;

    for (i, path) in scanned.files.iter().enumerate() {
        let file_num = i + 1;
        let filename = load::display_name(path);
        if let Some(ref cb) = config.progress_callback {
            cb.on_file_start(file_num, total_files, &filename);
        }

        let result = process_document(&provider, path, config).await;
        file_duration_ms += result.duration_ms;

        match (&result.error, &result.fields) {
            (None, Some(fields)) => {
                info!(
                    "Processed {} ({} fields, {} retries)",
                    filename,
                    fields.populated_count(),
                    result.retries
                );
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_complete(file_num, total_files, &filename, fields.populated_count());
                }
            }
            (Some(err), _) => {
                warn!("Failed {}: {}", filename, err);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_error(file_num, total_files, &filename, &err.to_string());
                }
            }
            (None, None) => unreachable!("successful result always carries fields"),
        }

        results.push(result);

        // Incremental save: an interrupted run keeps everything done so far.
        csv::write_results(csv_path, &results)?;
        debug!("Updated {}", csv_path.display());
    }

    // ── Step 4: Stats and the all-failed check ───────────────────────────
    let processed = results.iter().filter(|r| r.is_success()).count();
    let failed = results.len() - processed;

    if processed == 0 {
        let first_error = results
            .iter()
            .find_map(|r| r.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(ExtractError::AllFilesFailed {
            total: results.len(),
            first_error,
        });
    }

    let stats = BatchStats {
        total_files,
        processed_files: processed,
        failed_files: failed,
        skipped_files: scanned.skipped,
        total_input_tokens: results.iter().map(|r| r.input_tokens as u64).sum(),
        total_output_tokens: results.iter().map(|r| r.output_tokens as u64).sum(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        file_duration_ms,
    };

    info!(
        "Extraction complete: {}/{} files, {}ms total",
        processed, total_files, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total_files, processed);
    }

    Ok(BatchOutput { results, stats })
}

/// Extract fields from a single document.
///
/// Resolves the provider the same way [`extract_folder`] does; per-file
/// failures are reported on the returned [`FileResult`], not as `Err`.
pub async fn extract_file(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<FileResult, ExtractError> {
    let provider = resolve_provider(config)?;
    Ok(process_document(&provider, path.as_ref(), config).await)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Use the injected provider when present, otherwise build the Anthropic
/// client from the environment.
fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn VisionProvider>, ExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }
    let provider = AnthropicProvider::from_env(
        config.model.clone(),
        config.max_tokens,
        config.api_timeout_secs,
    )?;
    Ok(Arc::new(provider))
}

/// Run one document through the whole per-file pipeline.
///
/// Always returns a `FileResult` — never propagates the error upward, so a
/// single bad scan doesn't abort the batch. Callers check `result.error`.
async fn process_document(
    provider: &Arc<dyn VisionProvider>,
    path: &Path,
    config: &ExtractionConfig,
) -> FileResult {
    let start = Instant::now();
    let filename = load::display_name(path);

    let failed = |error: FileError, start: Instant, retries: u32| FileResult {
        filename: filename.clone(),
        fields: None,
        raw_response: None,
        input_tokens: 0,
        output_tokens: 0,
        duration_ms: start.elapsed().as_millis() as u64,
        retries,
        error: Some(error),
    };

    // Load, normalize, encode.
    let image = match load::load_document(path, config.max_dimension).await {
        Ok(img) => img,
        Err(e) => return failed(e, start, 0),
    };

    let name = filename.clone();
    let max_dimension = config.max_dimension;
    let quality = config.jpeg_quality;
    let max_bytes = config.max_encoded_bytes;
    let normalized = match tokio::task::spawn_blocking(move || {
        normalize::normalize(&image, &name, max_dimension, quality, max_bytes)
    })
    .await
    {
        Ok(Ok(n)) => n,
        Ok(Err(e)) => return failed(e, start, 0),
        Err(e) => {
            return failed(
                FileError::DecodeFailed {
                    filename: filename.clone(),
                    detail: format!("normalize task panicked: {e}"),
                },
                start,
                0,
            )
        }
    };
    let image_data = encode::encode_document(&normalized);

    // Vision call with retry/backoff. Backoff doubles per attempt:
    // 500 ms → 1 s → 2 s with the defaults.
    let prompt = config.prompt.as_deref().unwrap_or(DEFAULT_EXTRACTION_PROMPT);
    let mut last_err: Option<String> = None;
    let mut response: Option<(VisionResponse, u32)> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "{}: retry {}/{} after {}ms",
                filename, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match provider.analyze(&image_data, prompt).await {
            Ok(r) => {
                response = Some((r, attempt));
                break;
            }
            Err(e) => {
                warn!("{}: attempt {} failed — {}", filename, attempt + 1, e);
                last_err = Some(e);
            }
        }
    }

    let Some((response, retries)) = response else {
        let detail = last_err.unwrap_or_else(|| "unknown error".to_string());
        let error = if detail.contains("timed out") {
            FileError::Timeout {
                filename: filename.clone(),
                secs: config.api_timeout_secs,
            }
        } else {
            FileError::ApiFailed {
                filename: filename.clone(),
                retries: config.max_retries,
                detail,
            }
        };
        return failed(error, start, config.max_retries);
    };

    // Salvage the JSON object from the reply.
    match salvage::salvage_json(&response.content) {
        Ok(value) => FileResult {
            filename,
            fields: Some(DocumentFields::from_json(&value)),
            raw_response: None,
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            duration_ms: start.elapsed().as_millis() as u64,
            retries,
            error: None,
        },
        Err(failure) => FileResult {
            filename: filename.clone(),
            fields: None,
            // Keep the raw reply so the operator can see what came back.
            raw_response: Some(response.content),
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            duration_ms: start.elapsed().as_millis() as u64,
            retries,
            error: Some(FileError::ResponseNotJson {
                filename,
                detail: failure.to_string(),
            }),
        },
    }
}

/// Backoff before retry `attempt` (1-based): `base * 2^(attempt-1)`,
/// saturating so absurd `--max-retries` values never overflow the shift.
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ImageData;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn backoff_doubles_then_saturates() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 2), 1000);
        assert_eq!(backoff_ms(500, 3), 2000);
        // Exponents past u64 range clamp instead of panicking.
        assert_eq!(backoff_ms(500, 65), u64::MAX);
        assert_eq!(backoff_ms(500, u32::MAX), u64::MAX);
    }

    /// Provider that fails `failures` times, then succeeds with `reply`.
    struct FlakyProvider {
        calls: AtomicUsize,
        failures: usize,
        reply: String,
    }

    #[async_trait]
    impl VisionProvider for FlakyProvider {
        async fn analyze(&self, _image: &ImageData, _prompt: &str) -> Result<VisionResponse, String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err("HTTP 529: overloaded_error: Overloaded".to_string())
            } else {
                Ok(VisionResponse {
                    content: self.reply.clone(),
                    input_tokens: 100,
                    output_tokens: 50,
                })
            }
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn config_with(provider: Arc<dyn VisionProvider>) -> ExtractionConfig {
        ExtractionConfig::builder()
            .provider(provider)
            .retry_backoff_ms(1)
            .build()
            .unwrap()
    }

    fn sample_png(dir: &Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        image::RgbImage::from_pixel(60, 40, image::Rgb([120, 120, 200]))
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();
        path
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = sample_png(dir.path(), "id.png");
        let provider = Arc::new(FlakyProvider {
            calls: AtomicUsize::new(0),
            failures: 2,
            reply: r#"{"surname": "HANSEN"}"#.to_string(),
        });
        let config = config_with(provider.clone());

        let result = extract_file(&path, &config).await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.retries, 2);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            result.fields.unwrap().surname.as_deref(),
            Some("HANSEN")
        );
    }

    #[tokio::test]
    async fn retries_give_up_after_max() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = sample_png(dir.path(), "id.png");
        let provider = Arc::new(FlakyProvider {
            calls: AtomicUsize::new(0),
            failures: usize::MAX,
            reply: String::new(),
        });
        let config = config_with(provider.clone());

        let result = extract_file(&path, &config).await.unwrap();
        assert!(!result.is_success());
        assert!(matches!(
            result.error,
            Some(FileError::ApiFailed { retries: 3, .. })
        ));
        // initial attempt + 3 retries
        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn timeout_detail_maps_to_timeout_error() {
        struct TimeoutProvider;
        #[async_trait]
        impl VisionProvider for TimeoutProvider {
            async fn analyze(&self, _i: &ImageData, _p: &str) -> Result<VisionResponse, String> {
                Err("request timed out".to_string())
            }
        }

        let dir = tempfile::TempDir::new().unwrap();
        let path = sample_png(dir.path(), "id.png");
        let config = ExtractionConfig::builder()
            .provider(Arc::new(TimeoutProvider))
            .max_retries(0)
            .build()
            .unwrap();

        let result = extract_file(&path, &config).await.unwrap();
        assert!(matches!(result.error, Some(FileError::Timeout { secs: 60, .. })));
    }

    #[tokio::test]
    async fn unparseable_reply_keeps_raw_response() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = sample_png(dir.path(), "id.png");
        let provider = Arc::new(FlakyProvider {
            calls: AtomicUsize::new(0),
            failures: 0,
            reply: "I am unable to read this document.".to_string(),
        });
        let config = config_with(provider);

        let result = extract_file(&path, &config).await.unwrap();
        assert!(matches!(result.error, Some(FileError::ResponseNotJson { .. })));
        assert_eq!(
            result.raw_response.as_deref(),
            Some("I am unable to read this document.")
        );
        // Token usage is still recorded — the call itself succeeded.
        assert_eq!(result.input_tokens, 100);
    }

    #[tokio::test]
    async fn missing_file_is_per_file_error() {
        let provider = Arc::new(FlakyProvider {
            calls: AtomicUsize::new(0),
            failures: 0,
            reply: "{}".to_string(),
        });
        let config = config_with(provider.clone());

        let result = extract_file("/no/such/scan.jpg", &config).await.unwrap();
        assert!(matches!(result.error, Some(FileError::DecodeFailed { .. })));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0, "no API call made");
    }
}
