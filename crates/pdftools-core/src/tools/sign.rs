//! Signature stamp placed in a page corner

use serde::{Deserialize, Serialize};

use crate::document::{LoadOptions, PdfDocument, SaveOptions};
use crate::error::{PdfToolsError, Result};
use crate::image::{ImageFormat, ImageHandle};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    #[default]
    BottomRight,
    TopRight,
    TopLeft,
    BottomLeft,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignOptions {
    pub position: Corner,
    /// Multiplier applied to the image's pixel size
    pub scale: f32,
    /// Gap from both page edges, in points
    pub margin: f32,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            position: Corner::BottomRight,
            scale: 0.5,
            margin: 24.0,
        }
    }
}

impl SignOptions {
    fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(PdfToolsError::InvalidInput(format!(
                "signature scale must be positive, got {}",
                self.scale
            )));
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(PdfToolsError::InvalidInput(format!(
                "signature margin must be non-negative, got {}",
                self.margin
            )));
        }
        Ok(())
    }
}

/// Lower-left corner of an `image_width` x `image_height` box in `corner`
pub fn corner_origin(
    corner: Corner,
    page_width: f32,
    page_height: f32,
    image_width: f32,
    image_height: f32,
    margin: f32,
) -> (f32, f32) {
    match corner {
        Corner::BottomRight => (page_width - image_width - margin, margin),
        Corner::TopRight => (
            page_width - image_width - margin,
            page_height - image_height - margin,
        ),
        Corner::TopLeft => (margin, page_height - image_height - margin),
        Corner::BottomLeft => (margin, margin),
    }
}

/// Embed the stamp once, PNG before JPEG
fn embed_signature(doc: &mut PdfDocument, signature: &[u8]) -> Result<ImageHandle> {
    for format in [ImageFormat::Png, ImageFormat::Jpeg] {
        match doc.embed_raster_image(signature, format) {
            Err(PdfToolsError::UnsupportedImageFormat(_)) => continue,
            other => return other,
        }
    }
    Err(PdfToolsError::UnsupportedImageFormat(
        "signature must be a PNG or JPEG image".into(),
    ))
}

/// Draw `signature` on every page of `doc`; all pages share one image object
pub fn sign(doc: &mut PdfDocument, signature: &[u8], options: &SignOptions) -> Result<()> {
    options.validate()?;
    let image = embed_signature(doc, signature)?;
    let (width, height) = image.scale(options.scale);

    for page in doc.pages() {
        let size = doc.page_size(page)?;
        let (x, y) = corner_origin(
            options.position,
            size.width,
            size.height,
            width,
            height,
            options.margin,
        );
        doc.draw_image(page, &image, x, y, width, height)?;
    }
    Ok(())
}

pub fn sign_pdf(bytes: &[u8], signature: &[u8], options: &SignOptions) -> Result<Vec<u8>> {
    let mut doc = PdfDocument::load(bytes, &LoadOptions::default())?;
    sign(&mut doc, signature, options)?;
    let pages = doc.page_count();
    let out = doc.save(&SaveOptions::default())?;
    tracing::info!(pages, position = ?options.position, "signed document");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::test_support::letter_pdf;
    use crate::image::test_images::{jpeg_bytes, png_bytes};
    use lopdf::content::Content;
    use lopdf::Object;
    use pretty_assertions::assert_eq;

    /// (`cm` operands, XObject name) for each image painted on each page
    fn placements(bytes: &[u8]) -> Vec<Vec<([f32; 6], Vec<u8>)>> {
        let doc = lopdf::Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .into_values()
            .map(|page_id| {
                let content = doc.get_page_content(page_id).unwrap();
                let ops = Content::decode(&content).unwrap().operations;
                let mut found = Vec::new();
                for pair in ops.windows(2) {
                    if pair[0].operator == "cm" && pair[1].operator == "Do" {
                        let mut matrix = [0.0; 6];
                        for (slot, operand) in matrix.iter_mut().zip(&pair[0].operands) {
                            *slot = crate::document::number(operand).unwrap();
                        }
                        let name = match &pair[1].operands[0] {
                            Object::Name(name) => name.clone(),
                            _ => panic!("Do without a name"),
                        };
                        found.push((matrix, name));
                    }
                }
                found
            })
            .collect()
    }

    #[test]
    fn test_corner_origin() {
        let at = |corner| corner_origin(corner, 600.0, 800.0, 100.0, 50.0, 24.0);
        assert_eq!(at(Corner::BottomRight), (476.0, 24.0));
        assert_eq!(at(Corner::TopRight), (476.0, 726.0));
        assert_eq!(at(Corner::TopLeft), (24.0, 726.0));
        assert_eq!(at(Corner::BottomLeft), (24.0, 24.0));
    }

    #[test]
    fn test_sign_every_page_bottom_right() {
        let out = sign_pdf(&letter_pdf(3, "S"), &png_bytes(200, 100, true), &SignOptions::default()).unwrap();
        let pages = placements(&out);
        assert_eq!(pages.len(), 3);
        for page in pages {
            assert_eq!(page.len(), 1);
            let (matrix, _) = &page[0];
            assert_eq!(*matrix, [100.0, 0.0, 0.0, 50.0, 612.0 - 100.0 - 24.0, 24.0]);
        }
    }

    #[test]
    fn test_sign_shares_one_image_object() {
        let out = sign_pdf(&letter_pdf(4, "Shared"), &jpeg_bytes(80, 40), &SignOptions::default()).unwrap();
        let doc = lopdf::Document::load_mem(&out).unwrap();
        let images = doc
            .objects
            .values()
            .filter(|object| match object {
                Object::Stream(stream) => stream
                    .dict
                    .get(b"Subtype")
                    .and_then(|s| s.as_name())
                    .map(|name| name == b"Image")
                    .unwrap_or(false),
                _ => false,
            })
            .count();
        assert_eq!(images, 1);
    }

    #[test]
    fn test_sign_top_left_jpeg() {
        let options = SignOptions {
            position: Corner::TopLeft,
            scale: 1.0,
            margin: 10.0,
        };
        let out = sign_pdf(&letter_pdf(1, "J"), &jpeg_bytes(64, 32), &options).unwrap();
        let (matrix, _) = &placements(&out)[0][0];
        assert_eq!(*matrix, [64.0, 0.0, 0.0, 32.0, 10.0, 792.0 - 32.0 - 10.0]);
    }

    #[test]
    fn test_sign_rejects_unknown_image() {
        let err = sign_pdf(&letter_pdf(1, "G"), b"GIF89a....", &SignOptions::default()).unwrap_err();
        assert!(matches!(err, PdfToolsError::UnsupportedImageFormat(_)));
    }

    #[test]
    fn test_sign_rejects_bad_options() {
        let signature = png_bytes(10, 10, false);
        for options in [
            SignOptions { scale: 0.0, ..SignOptions::default() },
            SignOptions { margin: -1.0, ..SignOptions::default() },
        ] {
            let err = sign_pdf(&letter_pdf(1, "B"), &signature, &options).unwrap_err();
            assert!(matches!(err, PdfToolsError::InvalidInput(_)));
        }
    }

    #[test]
    fn test_options_from_json() {
        let options: SignOptions = serde_json::from_str(r#"{"position":"top-right"}"#).unwrap();
        assert_eq!(options.position, Corner::TopRight);
        assert_eq!(options.scale, 0.5);
        assert_eq!(options.margin, 24.0);
    }
}
