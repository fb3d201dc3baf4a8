//! Pipeline stages for document-field extraction.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch the PDF backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! scan ──▶ load ──▶ normalize ──▶ encode ──▶ (provider) ──▶ salvage ──▶ csv
//! (walk)  (decode)  (resize+jpeg)  (base64)   (API call)     (JSON)     (rows)
//! ```
//!
//! 1. [`scan`]      — list supported files in the input folder, sorted
//! 2. [`load`]      — decode the image, or rasterise a PDF's first page in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`normalize`] — resize, flatten alpha, JPEG-compress under the byte cap
//! 4. [`encode`]    — base64-wrap the JPEG for the multimodal request body
//! 5. [`salvage`]   — recover the JSON object from the model's free-form reply
//! 6. [`csv`]       — write the fixed-schema CSV, atomically, after each file
//!
//! The provider call itself lives in [`crate::batch`] together with the
//! retry loop, since that is orchestration rather than a pure transform.

pub mod csv;
pub mod encode;
pub mod load;
pub mod normalize;
pub mod salvage;
pub mod scan;
