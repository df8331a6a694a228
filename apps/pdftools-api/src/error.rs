//! Error types for the PDF toolbox API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdftools_core::PdfToolsError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Pdf(#[from] PdfToolsError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Pdf(err) => match err {
                PdfToolsError::WrongPassword => StatusCode::UNAUTHORIZED,
                PdfToolsError::CorruptDocument(_) | PdfToolsError::UnsupportedImageFormat(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                PdfToolsError::PageIndexOutOfRange { .. }
                | PdfToolsError::EmptyPassword
                | PdfToolsError::InvalidSplitPolicy(_)
                | PdfToolsError::InsufficientInput(_)
                | PdfToolsError::InvalidInput(_)
                | PdfToolsError::UnsupportedEncryption(_) => StatusCode::BAD_REQUEST,
                PdfToolsError::Operation(_) | PdfToolsError::Io(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Pdf(err) => err.kind(),
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal error: {}", self);
            "Internal error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": message,
            "kind": self.kind(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
