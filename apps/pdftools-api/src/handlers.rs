//! HTTP handlers for the PDF toolbox API
//!
//! Parsing and serializing PDFs is CPU-bound, so every tool runs on the
//! blocking pool with its own documents.

use std::sync::Arc;

use axum::{extract::State, Json};
use pdftools_core::artifact::{artifact_name, bundle_zip, write_atomic};
use pdftools_core::split::{split_pdf, SplitPolicy};
use pdftools_core::tools::{
    compress_pdf, images_to_pdf, merge_documents, page_count, parse_page_order, protect_pdf,
    reorder_pdf, sign_pdf, unlock_pdf, watermark_pdf,
};
use pdftools_core::{codec, PdfToolsError};

use crate::config::Config;
use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;

type Shared = State<Arc<AppState>>;

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

async fn run_blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> pdftools_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?
        .map_err(ApiError::from)
}

fn decode_all(items: &[String]) -> pdftools_core::Result<Vec<Vec<u8>>> {
    items.iter().map(|item| codec::decode(item)).collect()
}

/// Copy a result into the output directory, if one is configured
fn persist(config: &Config, name: &str, bytes: &[u8]) -> pdftools_core::Result<()> {
    if let Some(dir) = &config.output_dir {
        write_atomic(dir, name, bytes)?;
    }
    Ok(())
}

fn document_response(config: &Config, tool: &str, bytes: Vec<u8>) -> pdftools_core::Result<DocumentResponse> {
    let name = artifact_name(tool, "pdf");
    let pages = page_count(&bytes)?;
    persist(config, &name, &bytes)?;
    tracing::info!(tool, name = %name, size = bytes.len(), pages, "produced document");
    Ok(DocumentResponse {
        name,
        data: codec::encode(&bytes),
        size: bytes.len(),
        page_count: pages,
    })
}

/// Run `tool` over a single decoded document
async fn single<F>(state: Arc<AppState>, tool: &'static str, file: String, op: F) -> Result<Json<DocumentResponse>, ApiError>
where
    F: FnOnce(&[u8]) -> pdftools_core::Result<Vec<u8>> + Send + 'static,
{
    let response = run_blocking(move || {
        let bytes = codec::decode(&file)?;
        let output = op(&bytes)?;
        document_response(&state.config, tool, output)
    })
    .await?;
    Ok(Json(response))
}

pub async fn merge(State(state): Shared, Json(req): Json<MergeRequest>) -> Result<Json<DocumentResponse>, ApiError> {
    let response = run_blocking(move || {
        let files = decode_all(&req.files)?;
        let merged = merge_documents(&files)?;
        document_response(&state.config, "merge", merged)
    })
    .await?;
    Ok(Json(response))
}

pub async fn split(State(state): Shared, Json(req): Json<SplitRequest>) -> Result<Json<SplitResponse>, ApiError> {
    let policy = SplitPolicy::parse(req.mode.as_deref().unwrap_or("extract-all"), req.fixed_count)?;

    let response = run_blocking(move || {
        let bytes = codec::decode(&req.file)?;
        let parts = split_pdf(&bytes, &req.name, &policy)?;

        let archive = bundle_zip(
            parts
                .iter()
                .map(|part| (part.name.as_str(), part.bytes.as_slice())),
        )?;
        let files = parts
            .iter()
            .map(|part| {
                Ok(SplitPart {
                    name: part.name.clone(),
                    size: part.bytes.len(),
                    page_count: page_count(&part.bytes)?,
                })
            })
            .collect::<pdftools_core::Result<Vec<_>>>()?;

        let name = artifact_name("split", "zip");
        persist(&state.config, &name, &archive)?;
        tracing::info!(parts = files.len(), archive = %name, "split document");
        Ok(SplitResponse {
            archive: ArchiveEntry {
                name,
                data: codec::encode(&archive),
            },
            files,
        })
    })
    .await?;
    Ok(Json(response))
}

pub async fn reorder(State(state): Shared, Json(req): Json<ReorderRequest>) -> Result<Json<DocumentResponse>, ApiError> {
    if req.pages.is_none() && req.order.is_empty() {
        return Err(ApiError::InvalidRequest(
            "either `order` or `pages` is required".into(),
        ));
    }
    let ReorderRequest { file, order, pages } = req;
    single(state, "reorder", file, move |bytes| {
        let order = match pages {
            Some(pages) => parse_page_order(&pages)?,
            None => order,
        };
        reorder_pdf(bytes, &order)
    })
    .await
}

pub async fn compress(State(state): Shared, Json(req): Json<FileRequest>) -> Result<Json<DocumentResponse>, ApiError> {
    single(state, "compress", req.file, compress_pdf).await
}

pub async fn protect(State(state): Shared, Json(req): Json<PasswordRequest>) -> Result<Json<DocumentResponse>, ApiError> {
    if req.password.trim().is_empty() {
        return Err(PdfToolsError::EmptyPassword.into());
    }
    let password = req.password;
    single(state, "protect", req.file, move |bytes| protect_pdf(bytes, &password)).await
}

pub async fn unlock(State(state): Shared, Json(req): Json<PasswordRequest>) -> Result<Json<DocumentResponse>, ApiError> {
    let password = req.password;
    single(state, "unlock", req.file, move |bytes| unlock_pdf(bytes, &password)).await
}

pub async fn watermark(State(state): Shared, Json(req): Json<WatermarkRequest>) -> Result<Json<DocumentResponse>, ApiError> {
    let options = req.options;
    single(state, "watermark", req.file, move |bytes| watermark_pdf(bytes, &options)).await
}

pub async fn sign(State(state): Shared, Json(req): Json<SignRequest>) -> Result<Json<DocumentResponse>, ApiError> {
    let response = run_blocking(move || {
        let bytes = codec::decode(&req.file)?;
        let signature = codec::decode(&req.signature)?;
        let signed = sign_pdf(&bytes, &signature, &req.options)?;
        document_response(&state.config, "sign", signed)
    })
    .await?;
    Ok(Json(response))
}

pub async fn convert_images(
    State(state): Shared,
    Json(req): Json<ImagesRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let response = run_blocking(move || {
        let images = decode_all(&req.images)?;
        let pdf = images_to_pdf(&images)?;
        document_response(&state.config, "images-to-pdf", pdf)
    })
    .await?;
    Ok(Json(response))
}

pub async fn count_pages(Json(req): Json<FileRequest>) -> Result<Json<PageCountResponse>, ApiError> {
    let count = run_blocking(move || page_count(&codec::decode(&req.file)?)).await?;
    Ok(Json(PageCountResponse { page_count: count }))
}
