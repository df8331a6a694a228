//! Images to PDF, one page per image

use crate::document::{PdfDocument, SaveOptions};
use crate::error::{PdfToolsError, Result};
use crate::image::ImageFormat;

fn no_images() -> PdfToolsError {
    PdfToolsError::InsufficientInput("Add at least one image.".into())
}

/// Build a PDF whose pages are exactly the given images, at 1pt per pixel
///
/// Inputs are sniffed by content; anything that is not JPEG or PNG fails
/// with `UnsupportedImageFormat`.
pub fn images_to_pdf<B: AsRef<[u8]>>(images: &[B]) -> Result<Vec<u8>> {
    if images.is_empty() {
        return Err(no_images());
    }
    let mut doc = PdfDocument::create();
    for (i, bytes) in images.iter().enumerate() {
        let bytes = bytes.as_ref();
        let format = ImageFormat::sniff(bytes).ok_or_else(|| {
            PdfToolsError::UnsupportedImageFormat(format!("image {} is not JPEG or PNG", i + 1))
        })?;
        add_image_page(&mut doc, bytes, format)?;
    }
    finish(doc, images.len())
}

/// Like [`images_to_pdf`], but unrecognized inputs are skipped
pub fn images_to_pdf_lenient<B: AsRef<[u8]>>(images: &[B]) -> Result<Vec<u8>> {
    let mut doc = PdfDocument::create();
    for (i, bytes) in images.iter().enumerate() {
        let bytes = bytes.as_ref();
        match ImageFormat::sniff(bytes) {
            Some(format) => add_image_page(&mut doc, bytes, format)?,
            None => tracing::warn!(index = i, size = bytes.len(), "skipping unrecognized image"),
        }
    }
    if doc.page_count() == 0 {
        return Err(no_images());
    }
    finish(doc, images.len())
}

fn add_image_page(doc: &mut PdfDocument, bytes: &[u8], format: ImageFormat) -> Result<()> {
    let image = doc.embed_raster_image(bytes, format)?;
    let (width, height) = image.scale(1.0);
    let page = doc.add_blank_page(width, height)?;
    doc.draw_image(page, &image, 0.0, 0.0, width, height)
}

fn finish(doc: PdfDocument, inputs: usize) -> Result<Vec<u8>> {
    let pages = doc.page_count();
    let out = doc.save(&SaveOptions::default())?;
    tracing::info!(inputs, pages, "converted images to PDF");
    Ok(out)
}
