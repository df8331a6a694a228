//! Drawing images and text onto pages
//!
//! New content is appended as extra content streams. The first draw on a
//! page wraps its existing content in `q`/`Q` so a leftover transform in the
//! original stream cannot displace the new marks. Coordinates are PDF user
//! space: origin bottom-left, y up.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Object, ObjectId, Stream, StringFormat};
use serde::{Deserialize, Serialize};

use crate::document::{inherited_attribute, resolve, PageRef, PdfDocument};
use crate::error::{PdfToolsError, Result};
use crate::fonts::StandardFont;
use crate::image::ImageHandle;

/// Colour with components in 0..=1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const RED: Rgb = Rgb::new(1.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` (leading `#` optional); anything else is black
    pub fn from_hex(hex: &str) -> Self {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Self::BLACK;
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_or(0.0, |v| v as f32 / 255.0)
        };
        Self::new(channel(0..2), channel(2..4), channel(4..6))
    }

    fn clamped(&self) -> [f32; 3] {
        [self.r, self.g, self.b].map(|c| if c.is_finite() { c.clamp(0.0, 1.0) } else { 0.0 })
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::BLACK
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextOptions {
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub font: StandardFont,
    pub color: Rgb,
    pub opacity: f32,
    /// Counter-clockwise, around (x, y)
    pub rotation_degrees: f32,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            font_size: 12.0,
            font: StandardFont::Helvetica,
            color: Rgb::BLACK,
            opacity: 1.0,
            rotation_degrees: 0.0,
        }
    }
}

impl PdfDocument {
    /// Paint `image` into the rectangle with lower-left corner (x, y)
    pub fn draw_image(
        &mut self,
        page: PageRef,
        image: &ImageHandle,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<()> {
        self.ensure_unlocked()?;
        let name = self.add_resource(page.0, b"XObject", "Im", image.id)?;

        self.append_content(
            page.0,
            vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width.into(),
                        0.into(),
                        0.into(),
                        height.into(),
                        x.into(),
                        y.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(name)]),
                Operation::new("Q", vec![]),
            ],
        )
    }

    /// Show a single line of text anchored at (x, y)
    pub fn draw_text(&mut self, page: PageRef, text: &str, options: &TextOptions) -> Result<()> {
        self.ensure_unlocked()?;
        let font_id = self.embed_font(options.font)?;
        let font_name = self.add_resource(page.0, b"Font", "F", font_id)?;

        let mut operations = vec![Operation::new("q", vec![])];

        let opacity = if options.opacity.is_finite() {
            options.opacity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        if opacity < 1.0 {
            let state_id = self.graphics_state(opacity);
            let state_name = self.add_resource(page.0, b"ExtGState", "GS", state_id)?;
            operations.push(Operation::new("gs", vec![Object::Name(state_name)]));
        }

        let [r, g, b] = options.color.clamped();
        let (sin, cos) = options.rotation_degrees.to_radians().sin_cos();
        operations.extend([
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(font_name), options.font_size.into()]),
            Operation::new(
                "Tm",
                vec![
                    cos.into(),
                    sin.into(),
                    (-sin).into(),
                    cos.into(),
                    options.x.into(),
                    options.y.into(),
                ],
            ),
            Operation::new(
                "Tj",
                vec![Object::String(
                    options.font.encode_text(text),
                    StringFormat::Literal,
                )],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]);

        self.append_content(page.0, operations)
    }

    /// ExtGState with fill and stroke alpha, shared per opacity value
    fn graphics_state(&mut self, opacity: f32) -> ObjectId {
        let key = (opacity * 1000.0).round() as u32;
        if let Some(&id) = self.graphics_states.get(&key) {
            return id;
        }
        let id = self.inner.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => opacity,
            "CA" => opacity,
        });
        self.graphics_states.insert(key, id);
        id
    }

    /// Register `target` under `category` in the page's resources
    ///
    /// Resources are made local to the page first so inherited or shared
    /// dictionaries are never edited. A name already bound to `target` is
    /// reused.
    fn add_resource(
        &mut self,
        page_id: ObjectId,
        category: &[u8],
        prefix: &str,
        target: ObjectId,
    ) -> Result<Vec<u8>> {
        let mut resources = self.resolved_dict(inherited_attribute(&self.inner, page_id, b"Resources"));
        let mut entries = self.resolved_dict(resources.get(category).ok().cloned());

        let existing = entries.iter().find_map(|(name, value)| match value {
            Object::Reference(id) if *id == target => Some(name.clone()),
            _ => None,
        });
        let name = match existing {
            Some(name) => name,
            None => {
                let name = (1..)
                    .map(|n| format!("{}{}", prefix, n).into_bytes())
                    .find(|candidate| !entries.has(candidate))
                    .unwrap_or_else(|| prefix.as_bytes().to_vec());
                entries.set(name.clone(), target);
                name
            }
        };

        resources.set(category.to_vec(), entries);
        self.page_dict_mut(page_id)?.set("Resources", resources);
        Ok(name)
    }

    fn resolved_dict(&self, object: Option<Object>) -> Dictionary {
        object
            .as_ref()
            .and_then(|object| resolve(&self.inner, object))
            .and_then(|object| object.as_dict().ok())
            .cloned()
            .unwrap_or_default()
    }

    fn page_dict_mut(&mut self, page_id: ObjectId) -> Result<&mut Dictionary> {
        self.inner
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|_| PdfToolsError::Operation(format!("page {:?} not found", page_id)))
    }

    /// Readers concatenate `/Contents` arrays, so every stream we add starts
    /// and ends on a token boundary
    fn add_content_stream(&mut self, operations: Vec<Operation>) -> Result<ObjectId> {
        let encoded = Content { operations }
            .encode()
            .map_err(|e| PdfToolsError::Operation(format!("content encoding failed: {}", e)))?;
        let mut bytes = Vec::with_capacity(encoded.len() + 2);
        bytes.push(b'\n');
        bytes.extend_from_slice(&encoded);
        bytes.push(b'\n');
        Ok(self.inner.add_object(Stream::new(Dictionary::new(), bytes)))
    }

    fn append_content(&mut self, page_id: ObjectId, operations: Vec<Operation>) -> Result<()> {
        let new_stream = self.add_content_stream(operations)?;

        let current = self.page_dict_mut(page_id)?.get(b"Contents").ok().cloned();
        let mut contents = match current {
            Some(Object::Reference(id)) => match self.inner.get_object(id) {
                Ok(Object::Array(items)) => items.clone(),
                _ => vec![Object::Reference(id)],
            },
            Some(Object::Array(items)) => items,
            _ => Vec::new(),
        };

        if self.wrapped_pages.insert(page_id) && !contents.is_empty() {
            let open = self.add_content_stream(vec![Operation::new("q", vec![])])?;
            let close = self.add_content_stream(vec![Operation::new("Q", vec![])])?;
            contents.insert(0, Object::Reference(open));
            contents.push(Object::Reference(close));
        }
        contents.push(Object::Reference(new_stream));

        self.page_dict_mut(page_id)?.set("Contents", contents);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::test_support::letter_pdf;
    use crate::document::{number, LoadOptions};
    use crate::image::test_images::png_bytes;

    fn page_operators(doc: &PdfDocument, page: PageRef) -> Vec<String> {
        let content = doc.inner.get_page_content(page.object_id()).unwrap();
        Content::decode(&content)
            .unwrap()
            .operations
            .into_iter()
            .map(|op| op.operator)
            .collect()
    }

    #[test]
    fn test_from_hex() {
        assert_eq!(Rgb::from_hex("#FF0000"), Rgb::RED);
        assert_eq!(Rgb::from_hex("00ff00"), Rgb::new(0.0, 1.0, 0.0));
        assert_eq!(Rgb::from_hex("#F00"), Rgb::BLACK);
        assert_eq!(Rgb::from_hex("#GG0000"), Rgb::BLACK);
        assert_eq!(Rgb::from_hex(""), Rgb::BLACK);
    }

    #[test]
    fn test_first_draw_wraps_existing_content() {
        let mut doc = PdfDocument::load(&letter_pdf(1, "Wrap"), &LoadOptions::default()).unwrap();
        let page = doc.page(0).unwrap();
        doc.draw_text(page, "Hi", &TextOptions::default()).unwrap();
        doc.draw_text(page, "There", &TextOptions::default()).unwrap();

        let ops = page_operators(&doc, page);
        assert_eq!(ops.first().map(String::as_str), Some("q"));
        // one wrap pair plus one q/Q per draw
        assert_eq!(ops.iter().filter(|op| *op == "q").count(), 3);
        assert_eq!(ops.iter().filter(|op| *op == "Q").count(), 3);
    }

    #[test]
    fn test_wrap_streams_keep_operators_apart() {
        let mut doc = PdfDocument::load(&letter_pdf(1, "Join"), &LoadOptions::default()).unwrap();
        let page = doc.page(0).unwrap();
        doc.draw_text(page, "Hi", &TextOptions::default()).unwrap();

        let ops = page_operators(&doc, page);
        assert_eq!(ops[..2], ["q".to_string(), "BT".to_string()]);
        let close = ops.iter().position(|op| op == "Q").unwrap();
        assert_eq!(ops[close - 1..=close + 1], ["ET".to_string(), "Q".to_string(), "q".to_string()]);
    }

    #[test]
    fn test_draws_stack_in_call_order() {
        let mut doc = PdfDocument::create();
        let page = doc.add_blank_page(100.0, 100.0).unwrap();
        let below = doc.embed_image(&png_bytes(2, 2, false)).unwrap();
        let above = doc.embed_image(&png_bytes(3, 3, true)).unwrap();
        doc.draw_image(page, &below, 0.0, 0.0, 50.0, 50.0).unwrap();
        doc.draw_image(page, &above, 25.0, 25.0, 50.0, 50.0).unwrap();

        let dict = doc.inner.get_dictionary(page.object_id()).unwrap();
        let xobjects = dict
            .get(b"Resources")
            .and_then(Object::as_dict)
            .and_then(|resources| resources.get(b"XObject"))
            .and_then(Object::as_dict)
            .unwrap();
        let drawn: Vec<ObjectId> = {
            let content = doc.inner.get_page_content(page.object_id()).unwrap();
            Content::decode(&content)
                .unwrap()
                .operations
                .into_iter()
                .filter(|op| op.operator == "Do")
                .map(|op| {
                    let name = op.operands[0].as_name().unwrap();
                    xobjects.get(name).and_then(Object::as_reference).unwrap()
                })
                .collect()
        };
        assert_eq!(drawn, vec![below.id, above.id]);
    }

    #[test]
    fn test_draw_text_emits_rotation_matrix() {
        let mut doc = PdfDocument::create();
        let page = doc.add_blank_page(100.0, 100.0).unwrap();
        let options = TextOptions {
            x: 10.0,
            y: 20.0,
            rotation_degrees: 90.0,
            ..TextOptions::default()
        };
        doc.draw_text(page, "R", &options).unwrap();

        let content = doc.inner.get_page_content(page.object_id()).unwrap();
        let ops = Content::decode(&content).unwrap().operations;
        let tm = ops.iter().find(|op| op.operator == "Tm").unwrap();
        let values: Vec<f32> = tm.operands.iter().map(|o| number(o).unwrap()).collect();
        assert!((values[0]).abs() < 1e-6);
        assert!((values[1] - 1.0).abs() < 1e-6);
        assert!((values[2] + 1.0).abs() < 1e-6);
        assert_eq!(&values[4..], &[10.0, 20.0]);
    }

    #[test]
    fn test_opacity_adds_shared_graphics_state() {
        let mut doc = PdfDocument::create();
        let first = doc.add_blank_page(100.0, 100.0).unwrap();
        let second = doc.add_blank_page(100.0, 100.0).unwrap();
        let options = TextOptions {
            opacity: 0.5,
            ..TextOptions::default()
        };
        doc.draw_text(first, "A", &options).unwrap();
        doc.draw_text(second, "B", &options).unwrap();

        assert_eq!(doc.graphics_states.len(), 1);
        assert!(page_operators(&doc, first).contains(&"gs".to_string()));
    }

    #[test]
    fn test_opaque_text_skips_graphics_state() {
        let mut doc = PdfDocument::create();
        let page = doc.add_blank_page(100.0, 100.0).unwrap();
        doc.draw_text(page, "A", &TextOptions::default()).unwrap();
        assert!(doc.graphics_states.is_empty());
        assert!(!page_operators(&doc, page).contains(&"gs".to_string()));
    }

    #[test]
    fn test_same_image_reuses_resource_name() {
        let mut doc = PdfDocument::create();
        let page = doc.add_blank_page(100.0, 100.0).unwrap();
        let image = doc.embed_image(&png_bytes(2, 2, false)).unwrap();
        doc.draw_image(page, &image, 0.0, 0.0, 10.0, 10.0).unwrap();
        doc.draw_image(page, &image, 50.0, 50.0, 10.0, 10.0).unwrap();

        let dict = doc.inner.get_dictionary(page.object_id()).unwrap();
        let resources = dict.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        assert_eq!(xobjects.len(), 1);
        assert_eq!(
            page_operators(&doc, page).iter().filter(|op| *op == "Do").count(),
            2
        );
    }

    #[test]
    fn test_inherited_resources_are_localized() {
        let mut doc = PdfDocument::load(&letter_pdf(2, "Res"), &LoadOptions::default()).unwrap();
        let first = doc.page(0).unwrap();
        doc.draw_text(first, "Only here", &TextOptions::default()).unwrap();

        let second = doc.page(1).unwrap();
        let inherited = inherited_attribute(&doc.inner, second.object_id(), b"Resources").unwrap();
        let shared = doc.resolved_dict(Some(inherited));
        let fonts = doc.resolved_dict(shared.get(b"Font").ok().cloned());
        assert_eq!(fonts.len(), 1, "shared font dictionary must not be edited");
    }
}
