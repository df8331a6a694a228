//! PDF toolbox core
//!
//! Document operations for a PDF utility app, built on lopdf:
//! - `tools`: merge, reorder, compress, protect, unlock, watermark, sign, images to PDF
//! - `split`: one document per page or per fixed-size chunk
//! - `transplant`: deep copy of pages between documents
//! - `compositor`: drawing images and text onto pages
//! - `command`: JSON envelope over all of the above

pub mod artifact;
pub mod codec;
pub mod command;
mod compact;
pub mod compositor;
pub mod document;
pub mod encryption;
pub mod error;
pub mod fonts;
pub mod image;
pub mod render;
pub mod split;
pub mod tools;
pub mod transplant;

pub use artifact::{artifact_name, bundle_zip, format_file_size, write_atomic, FileReference};
pub use command::{execute, PdfCommand, ProcessMetrics, ProcessResult};
pub use compositor::{Rgb, TextOptions};
pub use document::{LoadOptions, PageRef, PageSize, PdfDocument, SaveOptions};
pub use encryption::{EncryptionSettings, Permissions, PrintPermission};
pub use error::{PdfToolsError, Result};
pub use fonts::StandardFont;
pub use image::{ImageFormat, ImageHandle};
pub use render::{pdf_to_images, PageRenderer, RenderedPage};
pub use split::{split, split_pdf, SplitOutput, SplitPolicy};
pub use transplant::copy_pages;
