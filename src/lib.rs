//! # id2csv
//!
//! Batch-extract identity-document fields from images and PDFs into CSV using
//! a vision LLM.
//!
//! ## Why this crate?
//!
//! Classic OCR on passports and ID cards needs per-layout templates and falls
//! apart on photographed (rather than scanned) documents. A vision LLM reads
//! the document as a human would: it finds the surname on a French passport
//! and on a Kenyan ID card without being told where to look. This crate wraps
//! that idea in a batch pipeline with per-file error isolation, so one corrupt
//! scan never loses a whole folder's worth of work.
//!
//! ## Pipeline Overview
//!
//! ```text
//! folder
//!  │
//!  ├─ 1. Scan       list supported files (png/jpg/jpeg/webp/pdf), sorted
//!  ├─ 2. Load       decode image, or rasterise PDF page 1 (spawn_blocking)
//!  ├─ 3. Normalize  resize to ≤2000px, flatten alpha, JPEG ≤5 MiB
//!  ├─ 4. Encode     JPEG → base64 ImageData
//!  ├─ 5. Provider   Anthropic Messages API call with retry/backoff
//!  ├─ 6. Salvage    recover the JSON object from the model's reply
//!  └─ 7. CSV        rewrite the output file after every processed document
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use id2csv::{extract_folder, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads ANTHROPIC_API_KEY from the environment.
//!     let config = ExtractionConfig::default();
//!     let output = extract_folder("scans/", "results.csv", &config).await?;
//!     eprintln!(
//!         "{}/{} documents extracted",
//!         output.stats.processed_files, output.stats.total_files
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `id2csv` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! id2csv = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod fields;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod provider;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{extract_file, extract_folder};
pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::{ExtractError, FileError};
pub use fields::{DocumentFields, CSV_COLUMNS};
pub use output::{BatchOutput, BatchStats, FileResult};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use provider::{AnthropicProvider, ImageData, VisionProvider, VisionResponse};
