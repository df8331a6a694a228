//! JSON command envelope
//!
//! A host that only moves text (a web view bridge, a message queue) sends a
//! `PdfCommand` with base64 payloads and gets back a `ProcessResult`.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::artifact::{artifact_name, bundle_zip};
use crate::codec;
use crate::error::Result;
use crate::split::{split_pdf, SplitPolicy};
use crate::tools::{
    compress_pdf, images_to_pdf, merge_documents, page_count, protect_pdf, reorder_pdf, sign_pdf,
    unlock_pdf, watermark_pdf, SignOptions, WatermarkOptions,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum PdfCommand {
    Merge {
        files: Vec<String>,
    },
    Split {
        file: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        policy: SplitPolicy,
    },
    Reorder {
        file: String,
        /// 0-based page indices
        order: Vec<usize>,
    },
    Compress {
        file: String,
    },
    Protect {
        file: String,
        password: String,
    },
    Unlock {
        file: String,
        #[serde(default)]
        password: String,
    },
    Watermark {
        file: String,
        #[serde(default)]
        options: WatermarkOptions,
    },
    Sign {
        file: String,
        signature: String,
        #[serde(default)]
        options: SignOptions,
    },
    ImagesToPdf {
        images: Vec<String>,
    },
    PageCount {
        file: String,
    },
}

impl PdfCommand {
    /// Tool name used for artifact naming
    pub fn tool(&self) -> &'static str {
        match self {
            PdfCommand::Merge { .. } => "merge",
            PdfCommand::Split { .. } => "split",
            PdfCommand::Reorder { .. } => "reorder",
            PdfCommand::Compress { .. } => "compress",
            PdfCommand::Protect { .. } => "protect",
            PdfCommand::Unlock { .. } => "unlock",
            PdfCommand::Watermark { .. } => "watermark",
            PdfCommand::Sign { .. } => "sign",
            PdfCommand::ImagesToPdf { .. } => "images-to-pdf",
            PdfCommand::PageCount { .. } => "page-count",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub success: bool,
    /// Artifact name, `{tool}-{epoch-millis}.{ext}`
    pub name: Option<String>,
    /// Base64-encoded output (a PDF, or a zip for split)
    pub data: Option<String>,
    pub error: Option<String>,
    /// Machine-readable error tag
    pub error_kind: Option<String>,
    pub metrics: Option<ProcessMetrics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessMetrics {
    pub input_size_bytes: usize,
    pub output_size_bytes: usize,
    pub page_count: usize,
    pub processing_time_ms: u64,
}

struct Output {
    name: Option<String>,
    bytes: Option<Vec<u8>>,
    input_size: usize,
    page_count: usize,
}

impl Output {
    /// A single PDF; the page count is read back from the result
    fn pdf(tool: &str, bytes: Vec<u8>, input_size: usize) -> Result<Self> {
        let page_count = page_count(&bytes)?;
        Ok(Self {
            name: Some(artifact_name(tool, "pdf")),
            bytes: Some(bytes),
            input_size,
            page_count,
        })
    }
}

/// Run a command to completion; errors are reported in the result
pub fn execute(command: PdfCommand) -> ProcessResult {
    let started = Instant::now();
    let tool = command.tool();

    match run(command) {
        Ok(output) => {
            let output_size = output.bytes.as_ref().map(Vec::len).unwrap_or(0);
            ProcessResult {
                success: true,
                name: output.name,
                data: output.bytes.as_deref().map(codec::encode),
                error: None,
                error_kind: None,
                metrics: Some(ProcessMetrics {
                    input_size_bytes: output.input_size,
                    output_size_bytes: output_size,
                    page_count: output.page_count,
                    processing_time_ms: started.elapsed().as_millis() as u64,
                }),
            }
        }
        Err(err) => {
            tracing::warn!(tool, kind = err.kind(), error = %err, "command failed");
            ProcessResult {
                success: false,
                name: None,
                data: None,
                error: Some(err.to_string()),
                error_kind: Some(err.kind().to_string()),
                metrics: None,
            }
        }
    }
}

fn decode_all(items: &[String]) -> Result<Vec<Vec<u8>>> {
    items.iter().map(|item| codec::decode(item)).collect()
}

fn run(command: PdfCommand) -> Result<Output> {
    let tool = command.tool();
    match command {
        PdfCommand::Merge { files } => {
            let files = decode_all(&files)?;
            let input_size = files.iter().map(Vec::len).sum();
            Output::pdf(tool, merge_documents(&files)?, input_size)
        }
        PdfCommand::Split { file, name, policy } => {
            let bytes = codec::decode(&file)?;
            let parts = split_pdf(&bytes, &name, &policy)?;
            let archive = bundle_zip(
                parts
                    .iter()
                    .map(|part| (part.name.as_str(), part.bytes.as_slice())),
            )?;
            Ok(Output {
                name: Some(artifact_name(tool, "zip")),
                bytes: Some(archive),
                input_size: bytes.len(),
                page_count: page_count(&bytes)?,
            })
        }
        PdfCommand::Reorder { file, order } => {
            let bytes = codec::decode(&file)?;
            Output::pdf(tool, reorder_pdf(&bytes, &order)?, bytes.len())
        }
        PdfCommand::Compress { file } => {
            let bytes = codec::decode(&file)?;
            Output::pdf(tool, compress_pdf(&bytes)?, bytes.len())
        }
        PdfCommand::Protect { file, password } => {
            let bytes = codec::decode(&file)?;
            Output::pdf(tool, protect_pdf(&bytes, &password)?, bytes.len())
        }
        PdfCommand::Unlock { file, password } => {
            let bytes = codec::decode(&file)?;
            Output::pdf(tool, unlock_pdf(&bytes, &password)?, bytes.len())
        }
        PdfCommand::Watermark { file, options } => {
            let bytes = codec::decode(&file)?;
            Output::pdf(tool, watermark_pdf(&bytes, &options)?, bytes.len())
        }
        PdfCommand::Sign {
            file,
            signature,
            options,
        } => {
            let bytes = codec::decode(&file)?;
            let signature = codec::decode(&signature)?;
            Output::pdf(
                tool,
                sign_pdf(&bytes, &signature, &options)?,
                bytes.len() + signature.len(),
            )
        }
        PdfCommand::ImagesToPdf { images } => {
            let images = decode_all(&images)?;
            let input_size = images.iter().map(Vec::len).sum();
            Output::pdf(tool, images_to_pdf(&images)?, input_size)
        }
        PdfCommand::PageCount { file } => {
            let bytes = codec::decode(&file)?;
            Ok(Output {
                name: None,
                bytes: None,
                input_size: bytes.len(),
                page_count: page_count(&bytes)?,
            })
        }
    }
}
