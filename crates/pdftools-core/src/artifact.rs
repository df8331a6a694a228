//! Files crossing the core boundary
//!
//! Derived artifacts are named `{tool}-{epoch-millis}.{ext}`, written
//! through a temporary file in the target directory and renamed into place
//! only after every byte is on disk.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{PdfToolsError, Result};

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// A byte-addressable file outside the core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReference {
    pub path: PathBuf,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl FileReference {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            size: None,
        }
    }

    /// Reference an existing file, taking name and size from the filesystem
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let size = std::fs::metadata(&path)?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            path,
            name,
            size: Some(size),
        })
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(&self.path)?)
    }
}

/// `{tool}-{now in epoch millis}.{ext}`
pub fn artifact_name(tool: &str, ext: &str) -> String {
    artifact_name_at(tool, ext, chrono::Utc::now().timestamp_millis())
}

pub fn artifact_name_at(tool: &str, ext: &str, epoch_millis: i64) -> String {
    format!("{}-{}.{}", tool, epoch_millis, ext.trim_start_matches('.'))
}

/// Write `bytes` to `dir/name` so readers see either nothing or the whole file
pub fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<FileReference> {
    let target = dir.join(name);
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(&target).map_err(|e| PdfToolsError::Io(e.error))?;

    tracing::debug!(path = %target.display(), size = bytes.len(), "wrote artifact");
    Ok(FileReference {
        path: target,
        name: name.to_string(),
        size: Some(bytes.len() as u64),
    })
}

/// Bundle named buffers into one deflated zip archive
pub fn bundle_zip<'a, I>(entries: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let zip_error = |e: zip::result::ZipError| PdfToolsError::Operation(format!("zip failed: {}", e));

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in entries {
        writer.start_file(name, options).map_err(zip_error)?;
        writer.write_all(bytes)?;
    }
    Ok(writer.finish().map_err(zip_error)?.into_inner())
}

/// Human-readable size: 1024-based, one decimal, `.0` dropped
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{:.1}", value);
    let shown = rounded.strip_suffix(".0").unwrap_or(&rounded);
    format!("{} {}", shown, SIZE_UNITS[unit])
}
