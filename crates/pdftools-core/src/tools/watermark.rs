//! Text watermark stamped at the centre of every page

use serde::{Deserialize, Serialize};

use crate::compositor::{Rgb, TextOptions};
use crate::document::{LoadOptions, PdfDocument, SaveOptions};
use crate::error::{PdfToolsError, Result};
use crate::fonts::StandardFont;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatermarkOptions {
    pub text: String,
    /// Font size in points
    pub size: f32,
    pub opacity: f32,
    /// Counter-clockwise, in degrees
    pub rotation: f32,
    /// `#RRGGBB`; unparseable values render black
    pub color: String,
    pub font: StandardFont,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            text: "CONFIDENTIAL".to_string(),
            size: 50.0,
            opacity: 0.5,
            rotation: 45.0,
            color: "#FF0000".to_string(),
            font: StandardFont::HelveticaBold,
        }
    }
}

impl WatermarkOptions {
    fn validate(&self) -> Result<()> {
        if !self.size.is_finite() || self.size < 0.0 {
            return Err(PdfToolsError::InvalidInput(format!(
                "watermark size must be non-negative, got {}",
                self.size
            )));
        }
        Ok(())
    }
}

/// Stamp `options.text` on every page of `doc`
///
/// The anchor is chosen so the unrotated text box is centred:
/// `(width/2 - textWidth/2, height/2 - textHeight/2)`.
pub fn watermark(doc: &mut PdfDocument, options: &WatermarkOptions) -> Result<()> {
    options.validate()?;
    let color = Rgb::from_hex(&options.color);
    let text_width = options.font.width_of_text_at_size(&options.text, options.size);
    let text_height = options.font.height_at_size(options.size);

    for page in doc.pages() {
        let size = doc.page_size(page)?;
        let text = TextOptions {
            x: size.width / 2.0 - text_width / 2.0,
            y: size.height / 2.0 - text_height / 2.0,
            font_size: options.size,
            font: options.font,
            color,
            opacity: options.opacity,
            rotation_degrees: options.rotation,
        };
        doc.draw_text(page, &options.text, &text)?;
    }
    Ok(())
}

pub fn watermark_pdf(bytes: &[u8], options: &WatermarkOptions) -> Result<Vec<u8>> {
    let mut doc = PdfDocument::load(bytes, &LoadOptions::default())?;
    watermark(&mut doc, options)?;
    let pages = doc.page_count();
    let out = doc.save(&SaveOptions::default())?;
    tracing::info!(pages, "watermarked document");
    Ok(out)
}
