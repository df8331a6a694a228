//! PDF-to-image boundary
//!
//! Rasterization is delegated to a `PageRenderer` supplied by the host
//! (a platform renderer, pdfium, a subprocess). This module validates the
//! request and checks the renderer returned one image per page.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::document::{LoadOptions, PdfDocument};
use crate::error::{PdfToolsError, Result};

pub const DEFAULT_RENDER_SCALE: f32 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedPage {
    pub image_path: PathBuf,
    pub width: u32,
    pub height: u32,
}

pub trait PageRenderer {
    /// Render every page of the PDF at `pdf_path`, in page order
    fn render_pages(&self, pdf_path: &Path, scale: f32) -> Result<Vec<RenderedPage>>;
}

/// Render each page of a PDF file to an image
///
/// `scale` defaults to 2.0. The result has exactly one entry per page.
pub fn pdf_to_images<R>(renderer: &R, pdf_path: &Path, scale: Option<f32>) -> Result<Vec<RenderedPage>>
where
    R: PageRenderer + ?Sized,
{
    let scale = scale.unwrap_or(DEFAULT_RENDER_SCALE);
    if !scale.is_finite() || scale <= 0.0 {
        return Err(PdfToolsError::InvalidInput(format!(
            "render scale must be positive, got {}",
            scale
        )));
    }

    let bytes = std::fs::read(pdf_path)?;
    let page_count = PdfDocument::load(&bytes, &LoadOptions::ignoring_encryption())?.page_count();

    let pages = renderer.render_pages(pdf_path, scale)?;
    if pages.len() != page_count {
        return Err(PdfToolsError::Operation(format!(
            "renderer produced {} images for {} pages",
            pages.len(),
            page_count
        )));
    }

    tracing::info!(pages = page_count, scale, "rendered pages to images");
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::test_support::sample_pdf;
    use std::cell::Cell;

    /// Reports page boxes at the requested scale without drawing anything
    struct BoxRenderer {
        drop_last: bool,
        calls: Cell<usize>,
    }

    impl PageRenderer for BoxRenderer {
        fn render_pages(&self, pdf_path: &Path, scale: f32) -> Result<Vec<RenderedPage>> {
            self.calls.set(self.calls.get() + 1);
            let doc = PdfDocument::load(&std::fs::read(pdf_path)?, &LoadOptions::default())?;
            let mut pages = Vec::new();
            for (i, page) in doc.pages().into_iter().enumerate() {
                let size = doc.page_size(page)?;
                pages.push(RenderedPage {
                    image_path: pdf_path.with_extension(format!("{}.png", i + 1)),
                    width: (size.width * scale) as u32,
                    height: (size.height * scale) as u32,
                });
            }
            if self.drop_last {
                pages.pop();
            }
            Ok(pages)
        }
    }

    fn write_sample(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("input.pdf");
        std::fs::write(&path, sample_pdf(2, "R", &[(100, 200), (300, 50)])).unwrap();
        path
    }

    #[test]
    fn test_default_scale_is_two() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(&dir);
        let renderer = BoxRenderer {
            drop_last: false,
            calls: Cell::new(0),
        };

        let pages = pdf_to_images(&renderer, &path, None).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!((pages[0].width, pages[0].height), (200, 400));
        assert_eq!((pages[1].width, pages[1].height), (600, 100));
    }

    #[test]
    fn test_rejects_bad_scale_without_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(&dir);
        let renderer = BoxRenderer {
            drop_last: false,
            calls: Cell::new(0),
        };

        for scale in [0.0, -1.0, f32::NAN] {
            let err = pdf_to_images(&renderer, &path, Some(scale)).unwrap_err();
            assert!(matches!(err, PdfToolsError::InvalidInput(_)));
        }
        assert_eq!(renderer.calls.get(), 0);
    }

    #[test]
    fn test_missing_pages_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(&dir);
        let renderer = BoxRenderer {
            drop_last: true,
            calls: Cell::new(0),
        };
        let err = pdf_to_images(&renderer, &path, Some(1.0)).unwrap_err();
        assert!(matches!(err, PdfToolsError::Operation(_)));
    }
}
