//! Document loading: file path → in-memory `DynamicImage`.
//!
//! Raster formats (png/jpg/jpeg/webp) decode through the `image` crate with
//! the format guessed from the file CONTENT, so a PNG misnamed `.jpg` still
//! loads; the extension only selects the raster-vs-PDF branch. PDFs rasterise their FIRST page only — identity documents are
//! single-sided scans, and a multi-page PDF is almost always a cover sheet
//! plus the document, where page 1 is the interesting one.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread, preventing the Tokio workers from stalling during rendering.
//! Image decoding gets the same treatment: a 40-megapixel phone photo takes
//! long enough to decode that it should not block the runtime either.

use crate::error::FileError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::debug;

/// File name (no directory) for error messages and CSV rows.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Load `path` into a `DynamicImage`, dispatching on extension.
///
/// `max_dimension` bounds PDF rasterisation so an A4 page never renders
/// larger than the normalize stage would immediately shrink it to.
pub async fn load_document(path: &Path, max_dimension: u32) -> Result<DynamicImage, FileError> {
    let filename = display_name(path);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" | "jpg" | "jpeg" | "webp" => {
            let p = path.to_path_buf();
            let name = filename.clone();
            tokio::task::spawn_blocking(move || {
                // Decoder selection by content, not extension: scanners and
                // phone exports routinely mislabel files (PNG bytes in a
                // .jpg), and such a file is still a perfectly good document.
                let reader = image::ImageReader::open(&p)
                    .and_then(|r| r.with_guessed_format())
                    .map_err(|e| FileError::DecodeFailed {
                        filename: name.clone(),
                        detail: e.to_string(),
                    })?;
                reader.decode().map_err(|e| FileError::DecodeFailed {
                    filename: name,
                    detail: e.to_string(),
                })
            })
            .await
            .map_err(|e| FileError::DecodeFailed {
                filename,
                detail: format!("decode task panicked: {e}"),
            })?
        }
        "pdf" => {
            let p = path.to_path_buf();
            let name = filename.clone();
            tokio::task::spawn_blocking(move || render_first_page(&p, &name, max_dimension))
                .await
                .map_err(|e| FileError::PdfRenderFailed {
                    filename,
                    detail: format!("render task panicked: {e}"),
                })?
        }
        other => Err(FileError::UnsupportedType {
            filename,
            extension: other.to_string(),
        }),
    }
}

/// Blocking implementation of first-page PDF rasterisation.
fn render_first_page(
    pdf_path: &Path,
    filename: &str,
    max_dimension: u32,
) -> Result<DynamicImage, FileError> {
    let pdfium = Pdfium::default();

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| FileError::PdfRenderFailed {
            filename: filename.to_string(),
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    if pages.len() == 0 {
        return Err(FileError::PdfRenderFailed {
            filename: filename.to_string(),
            detail: "document has no pages".to_string(),
        });
    }

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_dimension as i32)
        .set_maximum_height(max_dimension as i32);

    let page = pages.get(0).map_err(|e| FileError::PdfRenderFailed {
        filename: filename.to_string(),
        detail: format!("{e:?}"),
    })?;

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| FileError::PdfRenderFailed {
            filename: filename.to_string(),
            detail: format!("{e:?}"),
        })?;

    let image = bitmap.as_image();
    debug!(
        "Rendered first page of {} → {}x{} px",
        filename,
        image.width(),
        image.height()
    );

    Ok(image)
}
