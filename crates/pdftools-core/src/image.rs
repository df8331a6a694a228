//! Raster image embedding
//!
//! JPEG data is embedded untouched behind `DCTDecode`; only the frame
//! header is parsed. PNG data is decoded to 8-bit samples, the alpha
//! channel split into a soft mask, and both re-compressed with Flate.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};

use crate::document::PdfDocument;
use crate::error::{PdfToolsError, Result};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SIGNATURE: [u8; 3] = [0xFF, 0xD8, 0xFF];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Detect the format from magic bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&PNG_SIGNATURE) {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(&JPEG_SIGNATURE) {
            Some(ImageFormat::Jpeg)
        } else {
            None
        }
    }

    fn matches(&self, bytes: &[u8]) -> bool {
        match self {
            ImageFormat::Jpeg => bytes.starts_with(&JPEG_SIGNATURE),
            ImageFormat::Png => bytes.starts_with(&PNG_SIGNATURE),
        }
    }
}

/// An image XObject embedded in a document, with its pixel dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHandle {
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
}

impl ImageHandle {
    /// Dimensions multiplied by `factor`, in points
    pub fn scale(&self, factor: f32) -> (f32, f32) {
        (self.width as f32 * factor, self.height as f32 * factor)
    }
}

impl PdfDocument {
    /// Embed image bytes of a declared format
    ///
    /// Fails with `UnsupportedImageFormat` when the bytes do not carry that
    /// format's signature.
    pub fn embed_raster_image(&mut self, bytes: &[u8], format: ImageFormat) -> Result<ImageHandle> {
        self.ensure_unlocked()?;
        if !format.matches(bytes) {
            return Err(PdfToolsError::UnsupportedImageFormat(format!(
                "data is not a {:?} image",
                format
            )));
        }
        match format {
            ImageFormat::Jpeg => self.embed_jpeg(bytes),
            ImageFormat::Png => self.embed_png(bytes),
        }
    }

    /// Embed image bytes, detecting the format from content
    pub fn embed_image(&mut self, bytes: &[u8]) -> Result<ImageHandle> {
        let format = ImageFormat::sniff(bytes).ok_or_else(|| {
            PdfToolsError::UnsupportedImageFormat("expected a JPEG or PNG signature".into())
        })?;
        self.embed_raster_image(bytes, format)
    }

    pub fn embed_jpeg(&mut self, bytes: &[u8]) -> Result<ImageHandle> {
        self.ensure_unlocked()?;
        let frame = parse_jpeg_frame(bytes)?;

        let (color_space, decode) = match frame.components {
            1 => ("DeviceGray", None),
            3 => ("DeviceRGB", None),
            // Adobe CMYK JPEGs store inverted samples
            4 => ("DeviceCMYK", Some(vec![1, 0, 1, 0, 1, 0, 1, 0])),
            n => {
                return Err(PdfToolsError::UnsupportedImageFormat(format!(
                    "JPEG with {} components",
                    n
                )))
            }
        };

        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => frame.width as i64,
            "Height" => frame.height as i64,
            "ColorSpace" => color_space,
            "BitsPerComponent" => frame.bits as i64,
            "Filter" => "DCTDecode",
        };
        if let Some(decode) = decode {
            dict.set(
                "Decode",
                decode.into_iter().map(Object::Integer).collect::<Vec<_>>(),
            );
        }

        let id = self
            .inner
            .add_object(Stream::new(dict, bytes.to_vec()).with_compression(false));
        Ok(ImageHandle {
            id,
            width: frame.width,
            height: frame.height,
        })
    }

    pub fn embed_png(&mut self, bytes: &[u8]) -> Result<ImageHandle> {
        self.ensure_unlocked()?;
        let image = decode_png(bytes)?;

        let mut dict = image_dict(image.width, image.height, image.color_space);
        if let Some(alpha) = image.alpha {
            let mask_dict = image_dict(image.width, image.height, "DeviceGray");
            let mask_id = self
                .inner
                .add_object(Stream::new(mask_dict, deflate(&alpha)?).with_compression(false));
            dict.set("SMask", mask_id);
        }

        let id = self
            .inner
            .add_object(Stream::new(dict, deflate(&image.samples)?).with_compression(false));
        Ok(ImageHandle {
            id,
            width: image.width,
            height: image.height,
        })
    }
}

fn image_dict(width: u32, height: u32, color_space: &str) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

struct JpegFrame {
    width: u32,
    height: u32,
    components: u8,
    bits: u8,
}

fn parse_jpeg_frame(data: &[u8]) -> Result<JpegFrame> {
    let truncated = || PdfToolsError::UnsupportedImageFormat("truncated JPEG header".into());

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = data[pos + 1];
        pos += 2;

        match marker {
            0xFF => pos -= 1, // fill byte
            0x00 | 0x01 | 0xD0..=0xD7 => {}
            0xD9 | 0xDA => break,
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                let header = data.get(pos..pos + 8).ok_or_else(truncated)?;
                let height = u16::from_be_bytes([header[3], header[4]]) as u32;
                let width = u16::from_be_bytes([header[5], header[6]]) as u32;
                if width == 0 || height == 0 {
                    return Err(PdfToolsError::UnsupportedImageFormat(
                        "JPEG has zero dimensions".into(),
                    ));
                }
                return Ok(JpegFrame {
                    width,
                    height,
                    components: header[7],
                    bits: header[2],
                });
            }
            _ => {
                let length = data.get(pos..pos + 2).ok_or_else(truncated)?;
                pos += u16::from_be_bytes([length[0], length[1]]) as usize;
            }
        }
    }

    Err(PdfToolsError::UnsupportedImageFormat(
        "JPEG has no frame header".into(),
    ))
}

struct DecodedPng {
    width: u32,
    height: u32,
    color_space: &'static str,
    samples: Vec<u8>,
    /// Present only when some pixel is not fully opaque
    alpha: Option<Vec<u8>>,
}

fn decode_png(bytes: &[u8]) -> Result<DecodedPng> {
    let invalid = |e: png::DecodingError| PdfToolsError::UnsupportedImageFormat(format!("PNG: {}", e));

    let mut decoder = png::Decoder::new(bytes);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().map_err(invalid)?;
    let mut buffer = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buffer).map_err(invalid)?;
    buffer.truncate(info.buffer_size());

    let (color_space, channels) = match info.color_type {
        png::ColorType::Grayscale => ("DeviceGray", 1),
        png::ColorType::GrayscaleAlpha => ("DeviceGray", 2),
        png::ColorType::Rgb => ("DeviceRGB", 3),
        png::ColorType::Rgba => ("DeviceRGB", 4),
        png::ColorType::Indexed => {
            return Err(PdfToolsError::UnsupportedImageFormat(
                "PNG palette was not expanded".into(),
            ))
        }
    };

    let row_bytes = info.width as usize * channels;
    let (samples, alpha) = if channels == 2 || channels == 4 {
        let color_channels = channels - 1;
        let pixels = info.width as usize * info.height as usize;
        let mut samples = Vec::with_capacity(pixels * color_channels);
        let mut alpha = Vec::with_capacity(pixels);
        for row in buffer.chunks(info.line_size.max(row_bytes)) {
            for pixel in row[..row_bytes.min(row.len())].chunks_exact(channels) {
                samples.extend_from_slice(&pixel[..color_channels]);
                alpha.push(pixel[color_channels]);
            }
        }
        let opaque = alpha.iter().all(|&a| a == u8::MAX);
        (samples, (!opaque).then_some(alpha))
    } else {
        (buffer, None)
    };

    Ok(DecodedPng {
        width: info.width,
        height: info.height,
        color_space,
        samples,
        alpha,
    })
}
