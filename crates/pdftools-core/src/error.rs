use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfToolsError {
    #[error("Failed to parse PDF: {0}")]
    CorruptDocument(String),

    #[error("The password is incorrect or missing")]
    WrongPassword,

    #[error("Page index {index} is out of range (document has {page_count} pages)")]
    PageIndexOutOfRange { index: usize, page_count: usize },

    #[error("Unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("Invalid split mode: {0}")]
    InvalidSplitPolicy(String),

    #[error("{0}")]
    InsufficientInput(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported encryption: {0}")]
    UnsupportedEncryption(String),

    #[error("PDF operation failed: {0}")]
    Operation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PdfToolsError {
    /// Stable machine-readable tag for the error variant.
    pub fn kind(&self) -> &'static str {
        match self {
            PdfToolsError::CorruptDocument(_) => "corrupt_document",
            PdfToolsError::WrongPassword => "wrong_password",
            PdfToolsError::PageIndexOutOfRange { .. } => "page_index_out_of_range",
            PdfToolsError::UnsupportedImageFormat(_) => "unsupported_image_format",
            PdfToolsError::EmptyPassword => "empty_password",
            PdfToolsError::InvalidSplitPolicy(_) => "invalid_split_policy",
            PdfToolsError::InsufficientInput(_) => "insufficient_input",
            PdfToolsError::InvalidInput(_) => "invalid_input",
            PdfToolsError::UnsupportedEncryption(_) => "unsupported_encryption",
            PdfToolsError::Operation(_) => "operation_failed",
            PdfToolsError::Io(_) => "io",
        }
    }
}

impl From<lopdf::Error> for PdfToolsError {
    fn from(err: lopdf::Error) -> Self {
        PdfToolsError::Operation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PdfToolsError>;
