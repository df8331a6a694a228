//! Password protection and removal

use crate::document::{LoadOptions, PdfDocument, SaveOptions};
use crate::encryption::{EncryptionSettings, Permissions};
use crate::error::{PdfToolsError, Result};

/// Mark `doc` to be encrypted on save
///
/// Owner and user password are both `password`; users get high-resolution
/// printing and nothing else.
pub fn protect(doc: PdfDocument, password: &str) -> Result<PdfDocument> {
    protect_with(doc, password, Permissions::default())
}

pub fn protect_with(mut doc: PdfDocument, password: &str, permissions: Permissions) -> Result<PdfDocument> {
    if password.trim().is_empty() {
        return Err(PdfToolsError::EmptyPassword);
    }
    doc.set_encryption(EncryptionSettings {
        user_password: password.to_string(),
        owner_password: password.to_string(),
        permissions,
    })?;
    Ok(doc)
}

pub fn protect_pdf(bytes: &[u8], password: &str) -> Result<Vec<u8>> {
    if password.trim().is_empty() {
        return Err(PdfToolsError::EmptyPassword);
    }
    let doc = PdfDocument::load(bytes, &LoadOptions::ignoring_encryption())?;
    let protected = protect(doc, password)?;
    let out = protected.save(&SaveOptions::default())?;
    tracing::info!(size = out.len(), "protected document");
    Ok(out)
}

/// Open with `password` (none when blank) and save without encryption
pub fn unlock_pdf(bytes: &[u8], password: &str) -> Result<Vec<u8>> {
    let options = if password.is_empty() {
        LoadOptions::default()
    } else {
        LoadOptions::with_password(password)
    };
    let doc = PdfDocument::load(bytes, &options)?;
    let out = doc.save(&SaveOptions::default())?;
    tracing::info!(size = out.len(), "unlocked document");
    Ok(out)
}
