//! Whole-document tools built on the document model
//!
//! Each tool takes input bytes and returns output bytes; nothing is written
//! until the complete result exists in memory.

pub mod from_image;
pub mod merge;
pub mod reorder;
pub mod security;
pub mod sign;
pub mod watermark;

pub use from_image::{images_to_pdf, images_to_pdf_lenient};
pub use merge::{merge_documents, merge_files};
pub use reorder::{compress_pdf, page_count, parse_page_order, reorder, reorder_pdf};
pub use security::{protect, protect_pdf, protect_with, unlock_pdf};
pub use sign::{corner_origin, sign, sign_pdf, Corner, SignOptions};
pub use watermark::{watermark, watermark_pdf, WatermarkOptions};
