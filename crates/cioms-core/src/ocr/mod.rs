//! OCR intake: recognized text fragments and the engine seam.

mod adapter;
#[cfg(feature = "native")]
mod pure_engine;

pub use adapter::{OcrAdapter, TEXT_LAYER_LINE_HEIGHT, validate_input};
#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Enclosing rectangle of a quadrilateral given as `[x1, y1, ..., x4, y4]`.
    pub fn from_quad(quad: &[f32; 8]) -> Self {
        let xs = [quad[0], quad[2], quad[4], quad[6]];
        let ys = [quad[1], quad[3], quad[5], quad[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    /// Whether the horizontal extents of two boxes intersect.
    pub fn overlaps_horizontally(&self, other: &BoundingBox) -> bool {
        self.x < other.right() && other.x < self.right()
    }

    /// Shift the box down by `dy` pixels.
    pub fn offset_y(mut self, dy: f32) -> Self {
        self.y += dy;
        self
    }
}

/// One span of text recognized by the OCR engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    /// Recognized text content.
    pub text: String,

    /// Position on the page.
    pub bbox: BoundingBox,

    /// Recognition confidence score (0.0 - 1.0).
    pub confidence: f32,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            text: text.into(),
            bbox,
            confidence,
        }
    }
}

/// Result of running OCR over one input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrOutput {
    /// Fragments in reading order.
    pub fragments: Vec<TextFragment>,

    /// Dimensions (width, height) of the processed page area.
    pub image_size: (u32, u32),

    /// Processing time in milliseconds.
    pub processing_time_ms: u64,

    /// Name of the engine that produced the fragments.
    pub engine: String,
}

impl OcrOutput {
    /// Fragment texts grouped into visual lines, for diagnostics.
    pub fn lines(&self, row_tolerance_px: f32) -> Vec<String> {
        let mut lines: Vec<(f32, Vec<&str>)> = Vec::new();

        for fragment in &self.fragments {
            let y = fragment.bbox.y;
            match lines.last_mut() {
                Some((line_y, texts)) if (y - *line_y).abs() <= row_tolerance_px => {
                    texts.push(&fragment.text)
                }
                _ => lines.push((y, vec![&fragment.text])),
            }
        }

        lines.into_iter().map(|(_, texts)| texts.join(" ")).collect()
    }
}

/// An OCR capability: given an image, return recognized fragments.
pub trait OcrBackend {
    /// Recognize text in an image.
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextFragment>, OcrError>;

    /// Engine name for reporting.
    fn name(&self) -> &str;
}

impl<T: OcrBackend + ?Sized> OcrBackend for Box<T> {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextFragment>, OcrError> {
        (**self).recognize(image)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Sort fragments by reading order (top-to-bottom rows, then left-to-right).
pub fn sort_by_reading_order(fragments: &mut [TextFragment], row_tolerance_px: f32) {
    let bucket = row_tolerance_px.max(1.0);
    fragments.sort_by(|a, b| {
        // Group by approximate vertical position
        let row_a = (a.bbox.y / bucket) as i32;
        let row_b = (b.bbox.y / bucket) as i32;

        if row_a != row_b {
            row_a.cmp(&row_b)
        } else {
            a.bbox
                .x
                .partial_cmp(&b.bbox.x)
                .unwrap_or(std::cmp::Ordering::Equal)
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bbox_from_quad() {
        let bbox = BoundingBox::from_quad(&[10.0, 12.0, 90.0, 10.0, 92.0, 30.0, 8.0, 32.0]);
        assert_eq!(bbox, BoundingBox::new(8.0, 10.0, 84.0, 22.0));
        assert_eq!(bbox.right(), 92.0);
        assert_eq!(bbox.bottom(), 32.0);
    }

    #[test]
    fn test_overlaps_horizontally() {
        let a = BoundingBox::new(10.0, 0.0, 100.0, 20.0);
        assert!(a.overlaps_horizontally(&BoundingBox::new(15.0, 30.0, 60.0, 18.0)));
        assert!(!a.overlaps_horizontally(&BoundingBox::new(110.0, 30.0, 60.0, 18.0)));
    }

    #[test]
    fn test_sort_by_reading_order() {
        let mut fragments = vec![
            TextFragment::new("c", BoundingBox::new(10.0, 50.0, 10.0, 10.0), 0.9),
            TextFragment::new("b", BoundingBox::new(100.0, 12.0, 10.0, 10.0), 0.9),
            TextFragment::new("a", BoundingBox::new(10.0, 10.0, 10.0, 10.0), 0.9),
        ];

        sort_by_reading_order(&mut fragments, 20.0);

        let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_lines() {
        let output = OcrOutput {
            fragments: vec![
                TextFragment::new("Patient Initials", BoundingBox::new(10.0, 10.0, 80.0, 20.0), 0.95),
                TextFragment::new("J.D.", BoundingBox::new(100.0, 11.0, 40.0, 20.0), 0.93),
                TextFragment::new("Age", BoundingBox::new(10.0, 60.0, 30.0, 20.0), 0.9),
            ],
            image_size: (200, 100),
            processing_time_ms: 0,
            engine: "test".to_string(),
        };

        assert_eq!(output.lines(15.0), vec!["Patient Initials J.D.", "Age"]);
    }
}
