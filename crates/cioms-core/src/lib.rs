//! Core library for CIOMS adverse-event form extraction.
//!
//! This crate provides:
//! - Input intake for scanned images and PDFs
//! - An OCR seam with a PaddleOCR backend (`native` feature)
//! - Noise-tolerant label matching and spatial value location
//! - Categorized reports of the filled fields

pub mod error;
pub mod extraction;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod report;

pub use error::{CiomsError, InputError, OcrError, Result};
pub use extraction::{CiomsExtractor, ExtractionResult, FieldMatcher, FuzzyMatcher, PhraseMatcher};
pub use models::catalog::LabelCatalog;
pub use models::config::CiomsConfig;
pub use models::form::{CategorizedReport, CategorySection, Category, ExtractedField, FieldLabel};
pub use ocr::{BoundingBox, OcrAdapter, OcrBackend, OcrOutput, TextFragment};
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use report::format_text;
