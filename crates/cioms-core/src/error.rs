//! Error types for the cioms-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the cioms library.
#[derive(Error, Debug)]
pub enum CiomsError {
    /// The input could not be read or decoded.
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// The OCR engine failed.
    #[error("OCR failure: {0}")]
    Ocr(#[from] OcrError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to the input file.
///
/// These are raised before any OCR work is attempted.
#[derive(Error, Debug)]
pub enum InputError {
    /// The path does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but could not be read.
    #[error("cannot read {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    /// The file extension is not an image or PDF format we accept.
    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),

    /// The file could not be decoded as an image.
    #[error("cannot decode image {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// The PDF could not be processed.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),
}

/// Errors raised by the OCR engine.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract the text layer.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Result type for the cioms library.
pub type Result<T> = std::result::Result<T, CiomsError>;
