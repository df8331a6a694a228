//! Standard 14 fonts used for stamped text
//!
//! Only the Latin faces needed by the tools are carried. Text is encoded
//! with WinAnsiEncoding; characters outside it become `?`.

use lopdf::{dictionary, ObjectId};
use serde::{Deserialize, Serialize};

use crate::document::PdfDocument;
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StandardFont {
    Helvetica,
    #[default]
    HelveticaBold,
    Courier,
    CourierBold,
}

/// Advance widths for codes 32..=126, in 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, // 'A'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333,
    500, 278, 556, 500, 722, 500, 500, 500, // 'a'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    333, 333, 584, 584, 584, 611, 975, // ':'..'@'
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, // 'A'..'Z'
    333, 278, 333, 584, 556, 333, // '['..'`'
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389,
    556, 333, 611, 556, 778, 556, 556, 500, // 'a'..'z'
    389, 280, 389, 584, // '{'..'~'
];

/// Courier is monospaced
const COURIER_WIDTH: u16 = 600;

/// Characters in WinAnsiEncoding's 0x80..=0x9F block
const WIN_ANSI_HIGH: [(char, u8); 27] = [
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8A),
    ('‹', 0x8B),
    ('Œ', 0x8C),
    ('Ž', 0x8E),
    ('\u{2018}', 0x91),
    ('\u{2019}', 0x92),
    ('\u{201C}', 0x93),
    ('\u{201D}', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9A),
    ('›', 0x9B),
    ('œ', 0x9C),
    ('ž', 0x9E),
    ('Ÿ', 0x9F),
];

impl StandardFont {
    pub fn base_font_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
        }
    }

    fn is_monospaced(&self) -> bool {
        matches!(self, StandardFont::Courier | StandardFont::CourierBold)
    }

    /// (ascender, descender) in 1/1000 em
    fn vertical_metrics(&self) -> (f32, f32) {
        if self.is_monospaced() {
            (629.0, -157.0)
        } else {
            (718.0, -207.0)
        }
    }

    fn code_width(&self, code: u8) -> u16 {
        if self.is_monospaced() {
            return COURIER_WIDTH;
        }
        let table = match self {
            StandardFont::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
            _ => &HELVETICA_WIDTHS,
        };
        match code {
            32..=126 => table[(code - 32) as usize],
            _ => 556,
        }
    }

    /// WinAnsiEncoding bytes for `text`
    pub fn encode_text(&self, text: &str) -> Vec<u8> {
        text.chars().map(win_ansi_code).collect()
    }

    /// Advance width of `text` in points
    pub fn width_of_text_at_size(&self, text: &str, size: f32) -> f32 {
        let units: u32 = self
            .encode_text(text)
            .into_iter()
            .map(|code| u32::from(self.code_width(code)))
            .sum();
        units as f32 * size / 1000.0
    }

    /// Ascender-to-descender height in points
    pub fn height_at_size(&self, size: f32) -> f32 {
        let (ascender, descender) = self.vertical_metrics();
        (ascender - descender) * size / 1000.0
    }
}

fn win_ansi_code(c: char) -> u8 {
    match c as u32 {
        0x20..=0x7E | 0xA0..=0xFF => c as u8,
        _ => WIN_ANSI_HIGH
            .iter()
            .find(|(mapped, _)| *mapped == c)
            .map(|&(_, code)| code)
            .unwrap_or(b'?'),
    }
}

impl PdfDocument {
    /// Font dictionary for `font`, created once per document
    pub fn embed_font(&mut self, font: StandardFont) -> Result<ObjectId> {
        self.ensure_unlocked()?;
        if let Some(&id) = self.fonts.get(&font) {
            return Ok(id);
        }

        let id = self.inner.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font_name(),
            "Encoding" => "WinAnsiEncoding",
        });
        self.fonts.insert(font, id);
        Ok(id)
    }
}
