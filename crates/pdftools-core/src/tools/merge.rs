//! PDF Merge algorithm
//!
//! Combines multiple PDFs into a single document.

use crate::artifact::FileReference;
use crate::document::{LoadOptions, PdfDocument, SaveOptions};
use crate::error::{PdfToolsError, Result};
use crate::transplant::copy_pages;

/// Merge multiple PDFs into one
///
/// The algorithm:
/// 1. Fewer than two inputs is an error
/// 2. Create an empty destination document
/// 3. For each source, in order: load it, copy all of its pages, and
///    append the copies before the next source is touched
/// 4. Serialize the destination
pub fn merge_documents<B: AsRef<[u8]>>(documents: &[B]) -> Result<Vec<u8>> {
    if documents.len() < 2 {
        return Err(PdfToolsError::InsufficientInput(
            "Please select at least 2 PDF files.".into(),
        ));
    }

    let mut merged = PdfDocument::create();

    for (i, bytes) in documents.iter().enumerate() {
        let source = PdfDocument::load(bytes.as_ref(), &LoadOptions::default()).map_err(|e| match e {
            PdfToolsError::CorruptDocument(msg) => {
                PdfToolsError::CorruptDocument(format!("document {}: {}", i + 1, msg))
            }
            other => other,
        })?;

        let copied = copy_pages(&source, &mut merged, &source.page_indices())?;
        tracing::debug!(source = i, pages = copied.len(), "appending source pages");
        for page in copied {
            merged.add_page(page)?;
        }
    }

    let page_count = merged.page_count();
    let bytes = merged.save(&SaveOptions::default())?;
    tracing::info!(sources = documents.len(), pages = page_count, "merged documents");
    Ok(bytes)
}

/// Merge PDFs read from the filesystem, in the given order
pub fn merge_files(files: &[FileReference]) -> Result<Vec<u8>> {
    if files.len() < 2 {
        return Err(PdfToolsError::InsufficientInput(
            "Please select at least 2 PDF files.".into(),
        ));
    }
    let documents = files
        .iter()
        .map(FileReference::read)
        .collect::<Result<Vec<_>>>()?;
    merge_documents(&documents)
}
