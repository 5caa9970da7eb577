//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CiomsError, Result};

/// Main configuration for the cioms pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CiomsConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// PDF intake configuration.
    pub pdf: PdfConfig,

    /// Label matching configuration.
    pub matching: MatchConfig,

    /// Model configuration.
    pub models: ModelConfig,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Recognition confidence threshold (0.0 - 1.0). Fragments below it are dropped.
    pub recognition_threshold: f32,

    /// Keep `[UNK]` tokens emitted by the recognizer instead of blanking them.
    pub keep_unk: bool,

    /// Vertical bucket size in pixels used to sort fragments into reading order.
    pub row_tolerance_px: f32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            recognition_threshold: 0.0, // CTC confidence is low on handwriting
            keep_unk: false,
            row_tolerance_px: 20.0,
        }
    }
}

/// PDF intake configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Maximum pages to OCR (0 = unlimited).
    pub max_pages: usize,

    /// Vertical gap in pixels inserted between stacked pages.
    pub page_gap: f32,

    /// Read a substantial text layer instead of OCRing page images.
    pub prefer_embedded_text: bool,

    /// Non-whitespace characters a text layer needs to count as substantial.
    pub min_text_length: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            max_pages: 1,
            page_gap: 20.0,
            prefer_embedded_text: true,
            min_text_length: 50,
        }
    }
}

/// Label matching thresholds.
///
/// Tolerances expressed as factors are multiplied by the height of the
/// label fragment, so they scale with the scan resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Upper bound on the Levenshtein distance between a label phrasing and OCR text.
    pub max_edit_distance: usize,

    /// One edit is allowed per this many characters of phrasing.
    pub chars_per_edit: usize,

    /// Max vertical center offset, in label heights, for a fragment to share the label's row.
    pub row_tolerance: f32,

    /// Max gap, in label heights, between a label's bottom and a value below it.
    pub vertical_tolerance: f32,

    /// Candidates within this many pixels of the nearest one tie on proximity.
    pub proximity_tolerance: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_edit_distance: 2,
            chars_per_edit: 5,
            row_tolerance: 0.5,
            vertical_tolerance: 1.0,
            proximity_tolerance: 4.0,
        }
    }
}

/// Model file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
        }
    }
}

impl ModelConfig {
    /// Whether the detection and recognition models exist in `dir`.
    pub fn models_present(&self, dir: &Path) -> bool {
        dir.join(&self.detection_model).exists() && dir.join(&self.recognition_model).exists()
    }
}

impl CiomsConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| CiomsError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
