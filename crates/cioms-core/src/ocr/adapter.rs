//! Input validation and OCR invocation for a single file.

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{InputError, OcrError, Result};
use crate::models::config::{OcrConfig, PdfConfig};
use crate::pdf::{PdfExtractor, PdfProcessor};

use super::{BoundingBox, OcrBackend, OcrOutput, TextFragment, sort_by_reading_order};

/// Row height of the synthetic grid used for PDF text layers.
pub const TEXT_LAYER_LINE_HEIGHT: f32 = 20.0;

/// Approximate glyph width on the synthetic grid.
const TEXT_LAYER_CHAR_WIDTH: f32 = 8.0;

lazy_static! {
    static ref COLUMN_GAP: Regex = Regex::new(r"[ \t]{2,}").unwrap();
}

/// Check that `path` names a readable regular file.
///
/// Cheap enough to run before any OCR model is loaded.
pub fn validate_input(path: &Path) -> std::result::Result<(), InputError> {
    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => InputError::NotFound(path.to_path_buf()),
        _ => InputError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;

    if !metadata.is_file() {
        return Err(InputError::Unreadable {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }

    Ok(())
}

/// Turns an input path into ordered text fragments using an [`OcrBackend`].
pub struct OcrAdapter<B: OcrBackend> {
    backend: B,
    ocr_config: OcrConfig,
    pdf_config: PdfConfig,
}

impl<B: OcrBackend> OcrAdapter<B> {
    /// Create an adapter with default configuration.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            ocr_config: OcrConfig::default(),
            pdf_config: PdfConfig::default(),
        }
    }

    /// Set OCR configuration.
    pub fn with_ocr_config(mut self, config: OcrConfig) -> Self {
        self.ocr_config = config;
        self
    }

    /// Set PDF configuration.
    pub fn with_pdf_config(mut self, config: PdfConfig) -> Self {
        self.pdf_config = config;
        self
    }

    /// The wrapped engine.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Recognize all text in an image or PDF file.
    ///
    /// Input problems surface as [`InputError`] before the engine is invoked;
    /// engine problems surface as [`OcrError`]. An input without any text
    /// yields an empty fragment list, not an error.
    pub fn recognize_path(&self, path: &Path) -> Result<OcrOutput> {
        let start = Instant::now();

        validate_input(path)?;

        let data = std::fs::read(path).map_err(|e| InputError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        info!("Processing file: {} ({} bytes)", path.display(), data.len());

        let (fragments, image_size) = if is_pdf(path, &data) {
            self.recognize_pdf(&data)?
        } else {
            let image = decode_image(path, &data)?;
            let fragments = self.recognize_image(&image)?;
            (fragments, image.dimensions())
        };

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "OCR complete: {} fragments in {}ms",
            fragments.len(),
            processing_time_ms
        );

        Ok(OcrOutput {
            fragments,
            image_size,
            processing_time_ms,
            engine: self.backend.name().to_string(),
        })
    }

    /// Run the engine on a decoded image and return fragments in reading order.
    pub fn recognize_image(&self, image: &DynamicImage) -> std::result::Result<Vec<TextFragment>, OcrError> {
        let (width, height) = image.dimensions();
        debug!("Running {} on {}x{} image", self.backend.name(), width, height);

        let recognized = self.backend.recognize(image)?;
        let total = recognized.len();

        let mut fragments: Vec<TextFragment> = recognized
            .into_iter()
            .filter(|f| f.confidence >= self.ocr_config.recognition_threshold)
            .collect();

        if fragments.len() < total {
            debug!(
                "Dropped {} fragments below confidence {}",
                total - fragments.len(),
                self.ocr_config.recognition_threshold
            );
        }

        sort_by_reading_order(&mut fragments, self.ocr_config.row_tolerance_px);
        Ok(fragments)
    }

    fn recognize_pdf(&self, data: &[u8]) -> Result<(Vec<TextFragment>, (u32, u32))> {
        let mut extractor = PdfExtractor::new();
        extractor.load(data).map_err(InputError::from)?;

        let text = text_layer(&extractor);
        let text_chars = text.chars().filter(|c| !c.is_whitespace()).count();

        // Digital forms carry their text; OCR would only lose accuracy
        if self.pdf_config.prefer_embedded_text && text_chars >= self.pdf_config.min_text_length {
            info!("Using PDF text layer ({} characters)", text_chars);
            return Ok(text_layer_output(&text));
        }

        let (fragments, image_size) = self.recognize_page_images(&extractor)?;
        if !fragments.is_empty() || text_chars == 0 {
            return Ok((fragments, image_size));
        }

        debug!("Page images yielded no text, reading the text layer");
        Ok(text_layer_output(&text))
    }

    /// OCR the largest image of each page, stacking pages vertically.
    fn recognize_page_images(&self, extractor: &PdfExtractor) -> Result<(Vec<TextFragment>, (u32, u32))> {
        let page_count = extractor.page_count();
        let page_limit = match self.pdf_config.max_pages {
            0 => page_count,
            max => page_count.min(max as u32),
        };

        let mut fragments = Vec::new();
        let mut offset = 0.0f32;
        let mut width = 0u32;

        for page in 1..=page_limit {
            let images = extractor.extract_images(page).map_err(InputError::from)?;

            // The scan is the largest image on the page
            let Some(image) = images
                .into_iter()
                .max_by_key(|img| img.width() as u64 * img.height() as u64)
            else {
                debug!("No page image on page {}", page);
                continue;
            };

            let page_fragments = self.recognize_image(&image)?;
            debug!("Page {}: {} fragments", page, page_fragments.len());

            fragments.extend(page_fragments.into_iter().map(|mut f| {
                f.bbox = f.bbox.offset_y(offset);
                f
            }));

            width = width.max(image.width());
            offset += image.height() as f32 + self.pdf_config.page_gap;
        }

        let height = if width > 0 {
            (offset - self.pdf_config.page_gap).max(0.0) as u32
        } else {
            0
        };
        Ok((fragments, (width, height)))
    }
}

/// Text layer of a loaded PDF; unreadable layers count as empty.
fn text_layer(extractor: &PdfExtractor) -> String {
    match extractor.extract_text() {
        Ok(text) => text,
        Err(e) => {
            warn!("Could not read PDF text layer: {}", e);
            String::new()
        }
    }
}

fn text_layer_output(text: &str) -> (Vec<TextFragment>, (u32, u32)) {
    let fragments = text_layer_fragments(text);

    let width = fragments
        .iter()
        .map(|f| f.bbox.right())
        .fold(0.0f32, f32::max) as u32;
    let height = fragments
        .iter()
        .map(|f| f.bbox.bottom())
        .fold(0.0f32, f32::max) as u32;

    (fragments, (width, height))
}

fn is_pdf(path: &Path, data: &[u8]) -> bool {
    data.starts_with(b"%PDF")
        || path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn decode_image(path: &Path, data: &[u8]) -> std::result::Result<DynamicImage, InputError> {
    let format = image::guess_format(data).map_err(|_| {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        InputError::UnsupportedFormat(if extension.is_empty() {
            path.display().to_string()
        } else {
            extension
        })
    })?;

    image::load_from_memory_with_format(data, format).map_err(|e| InputError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Lay text-layer lines out on a synthetic grid.
///
/// Runs of two or more spaces separate columns, so a label and the value
/// typeset beside it become separate fragments on the same row.
fn text_layer_fragments(text: &str) -> Vec<TextFragment> {
    let mut fragments = Vec::new();

    let lines = text.lines().filter(|line| !line.trim().is_empty());
    for (row, line) in lines.enumerate() {
        let y = row as f32 * TEXT_LAYER_LINE_HEIGHT;
        let gaps = COLUMN_GAP
            .find_iter(line)
            .map(|m| (m.start(), m.end()))
            .chain(std::iter::once((line.len(), line.len())));

        let mut cell_start = 0;
        for (gap_start, gap_end) in gaps {
            let cell = &line[cell_start..gap_start];
            let trimmed = cell.trim();

            if !trimmed.is_empty() {
                let indent = cell.chars().take_while(|c| c.is_whitespace()).count();
                let column = line[..cell_start].chars().count() + indent;
                let bbox = BoundingBox::new(
                    column as f32 * TEXT_LAYER_CHAR_WIDTH,
                    y,
                    trimmed.chars().count() as f32 * TEXT_LAYER_CHAR_WIDTH,
                    TEXT_LAYER_LINE_HEIGHT,
                );
                fragments.push(TextFragment::new(trimmed, bbox, 1.0));
            }
            cell_start = gap_end;
        }
    }

    fragments
}
