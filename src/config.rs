//! Configuration types for batch document extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across calls, serialise them for logging, and
//! diff two runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A ten-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use crate::provider::VisionProvider;
use std::fmt;
use std::sync::Arc;

/// Configuration for a batch extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use id2csv::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .model("claude-3-haiku-20240307")
///     .max_retries(5)
///     .jpeg_quality(90)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Vision model identifier. Default: "claude-3-haiku-20240307".
    ///
    /// Haiku-class models read the large, printed text of identity documents
    /// reliably at a fraction of the cost of the larger tiers. Switch to a
    /// Sonnet-class model for heavily worn or handwritten documents.
    pub model: String,

    /// Maximum tokens the model may generate per document. Default: 1024.
    ///
    /// The expected reply is a single ~150-token JSON object; 1024 leaves
    /// headroom for models that pad the reply with prose the salvage stage
    /// then strips. Setting this too low truncates the JSON mid-object and
    /// guarantees a salvage failure.
    pub max_tokens: usize,

    /// Maximum image dimension (width or height) in pixels. Default: 2000.
    ///
    /// Identity documents are small; 2000 px across the long edge keeps every
    /// printed field legible to the model while bounding upload size. Phone
    /// photos arrive at 4000×3000 and gain nothing from the extra pixels.
    pub max_dimension: u32,

    /// Initial JPEG quality for compression (1–100). Default: 85.
    ///
    /// The normalize stage steps quality down by 5 from here until the
    /// encoded image fits under [`max_encoded_bytes`](Self::max_encoded_bytes).
    pub jpeg_quality: u8,

    /// Maximum encoded image size in bytes. Default: 5 MiB.
    ///
    /// The Messages API rejects oversized image blocks; staying under 5 MiB
    /// of JPEG keeps the base64 body comfortably inside the request limit.
    pub max_encoded_bytes: usize,

    /// Maximum retry attempts on a transient API failure. Default: 3.
    ///
    /// Most 5xx/529 and timeout errors are transient (overloaded backend,
    /// network blip). Permanent errors (bad API key, 400) are not worth
    /// retrying but cost only the extra attempts; the per-file error records
    /// how many were made.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,

    /// Per-API-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Custom extraction prompt. If None, uses the built-in default.
    pub prompt: Option<String>,

    /// Pre-constructed vision provider. If None, an [`crate::AnthropicProvider`]
    /// is built from `ANTHROPIC_API_KEY`. Inject a mock here in tests.
    pub provider: Option<Arc<dyn VisionProvider>>,

    /// Progress callback for per-file events. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-haiku-20240307".to_string(),
            max_tokens: 1024,
            max_dimension: 2000,
            jpeg_quality: 85,
            max_encoded_bytes: 5 * 1024 * 1024,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            prompt: None,
            provider: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("max_dimension", &self.max_dimension)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("max_encoded_bytes", &self.max_encoded_bytes)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("prompt", &self.prompt.as_ref().map(|p| p.len()))
            .field("provider", &self.provider.as_ref().map(|_| "<dyn VisionProvider>"))
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_dimension(mut self, px: u32) -> Self {
        self.config.max_dimension = px.max(100);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn max_encoded_bytes(mut self, bytes: usize) -> Self {
        self.config.max_encoded_bytes = bytes;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn VisionProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.jpeg_quality == 0 || c.jpeg_quality > 100 {
            return Err(ExtractError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        if c.max_dimension < 100 {
            return Err(ExtractError::InvalidConfig(format!(
                "max_dimension must be ≥ 100 px, got {}",
                c.max_dimension
            )));
        }
        if c.max_encoded_bytes < 64 * 1024 {
            return Err(ExtractError::InvalidConfig(format!(
                "max_encoded_bytes must be ≥ 65536, got {}",
                c.max_encoded_bytes
            )));
        }
        if c.max_tokens == 0 {
            return Err(ExtractError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let c = ExtractionConfig::default();
        assert_eq!(c.model, "claude-3-haiku-20240307");
        assert_eq!(c.max_dimension, 2000);
        assert_eq!(c.jpeg_quality, 85);
        assert_eq!(c.max_encoded_bytes, 5 * 1024 * 1024);
        assert_eq!(c.max_retries, 3);
    }

    #[test]
    fn builder_clamps_quality_and_dimension() {
        let c = ExtractionConfig::builder()
            .jpeg_quality(250)
            .max_dimension(10)
            .build()
            .unwrap();
        assert_eq!(c.jpeg_quality, 100);
        assert_eq!(c.max_dimension, 100);
    }

    #[test]
    fn builder_rejects_tiny_byte_budget() {
        let err = ExtractionConfig::builder()
            .max_encoded_bytes(1024)
            .build()
            .unwrap_err();
        assert!(matches!(err, ExtractError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_max_tokens() {
        let err = ExtractionConfig::builder().max_tokens(0).build().unwrap_err();
        assert!(err.to_string().contains("max_tokens"));
    }

    #[test]
    fn debug_does_not_leak_prompt_body() {
        let c = ExtractionConfig::builder()
            .prompt("secret instructions")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret instructions"));
    }
}
