//! Request and response bodies
//!
//! Documents and images travel as base64 strings.

use pdftools_core::tools::{SignOptions, WatermarkOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct MergeRequest {
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SplitRequest {
    pub file: String,
    /// Original file name, used to name the parts
    #[serde(default)]
    pub name: String,
    /// `extract-all` (default) or `fixed-range`
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub fixed_count: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReorderRequest {
    pub file: String,
    /// 0-based page indices
    #[serde(default)]
    pub order: Vec<usize>,
    /// 1-based page list such as `"3, 1-2"`; takes precedence over `order`
    #[serde(default)]
    pub pages: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileRequest {
    pub file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordRequest {
    pub file: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatermarkRequest {
    pub file: String,
    #[serde(flatten)]
    pub options: WatermarkOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignRequest {
    pub file: String,
    pub signature: String,
    #[serde(flatten)]
    pub options: SignOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImagesRequest {
    pub images: Vec<String>,
}

/// A produced PDF
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub name: String,
    pub data: String,
    pub size: usize,
    pub page_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitPart {
    pub name: String,
    pub size: usize,
    pub page_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitResponse {
    pub archive: ArchiveEntry,
    pub files: Vec<SplitPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageCountResponse {
    pub page_count: usize,
}
