//! PaddleOCR engine backed by `pure-onnx-ocr`.

use std::path::Path;

use image::DynamicImage;
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::{ModelConfig, OcrConfig};

use super::{BoundingBox, OcrBackend, TextFragment};

/// OCR engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
///
/// Models are loaded once in [`PureOcrEngine::from_dir`]; the engine is then
/// passed explicitly to an [`super::OcrAdapter`].
pub struct PureOcrEngine {
    engine: pure_onnx_ocr::engine::OcrEngine,
    config: OcrConfig,
}

impl PureOcrEngine {
    /// Create an engine from model files in a directory.
    pub fn from_dir(model_dir: &Path, models: &ModelConfig, config: OcrConfig) -> Result<Self, OcrError> {
        let det_path = model_dir.join(&models.detection_model);
        let rec_path = model_dir.join(&models.recognition_model);
        let dict_path = model_dir.join(&models.dictionary);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!(
                    "missing model file {}",
                    path.display()
                )));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self { engine, config })
    }
}

impl OcrBackend for PureOcrEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextFragment>, OcrError> {
        let results = self
            .engine
            .run_from_image(image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        debug!("pure-onnx-ocr returned {} text regions", results.len());

        Ok(results
            .iter()
            .map(|r| {
                let text = if self.config.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                TextFragment::new(text, polygon_to_bbox(&r.bounding_box), r.confidence)
            })
            .collect())
    }

    fn name(&self) -> &str {
        "PaddleOCR (pure-onnx-ocr)"
    }
}

/// Convert a `Polygon<f64>` to an axis-aligned box over its first four corners.
fn polygon_to_bbox(polygon: &pure_onnx_ocr::Polygon<f64>) -> BoundingBox {
    let mut quad = [0.0f32; 8];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        quad[i * 2] = coord.x as f32;
        quad[i * 2 + 1] = coord.y as f32;
    }
    BoundingBox::from_quad(&quad)
}
