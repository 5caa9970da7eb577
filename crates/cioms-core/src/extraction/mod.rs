//! CIOMS field extraction: label matching and categorization.

mod categorizer;
pub mod fuzzy;
mod matcher;
pub mod patterns;

pub use categorizer::categorize;
pub use fuzzy::{FuzzyMatcher, PhraseMatch, PhraseMatcher, normalize};
pub use matcher::{FieldMatcher, MatchedValue};
pub use patterns::is_filled;

use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::models::catalog::LabelCatalog;
use crate::models::config::CiomsConfig;
use crate::models::form::CategorizedReport;
use crate::ocr::{OcrAdapter, OcrBackend, OcrOutput, TextFragment};

/// Result of extracting one form.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// Grouped filled fields.
    pub report: CategorizedReport,

    /// Raw OCR output the report was built from.
    #[serde(skip)]
    pub ocr: OcrOutput,

    /// Total processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Full pipeline: OCR adapter, field matcher, categorizer.
pub struct CiomsExtractor<B: OcrBackend, M: PhraseMatcher = FuzzyMatcher> {
    adapter: OcrAdapter<B>,
    matcher: FieldMatcher<M>,
    catalog: LabelCatalog,
}

impl<B: OcrBackend> CiomsExtractor<B, FuzzyMatcher> {
    /// Build a pipeline around `backend` using `config` and the built-in catalog.
    pub fn from_config(backend: B, config: &CiomsConfig) -> Self {
        let adapter = OcrAdapter::new(backend)
            .with_ocr_config(config.ocr.clone())
            .with_pdf_config(config.pdf.clone());

        Self::new(
            adapter,
            FieldMatcher::from_config(config.matching.clone()),
            LabelCatalog::cioms(),
        )
    }
}

impl<B: OcrBackend, M: PhraseMatcher> CiomsExtractor<B, M> {
    /// Assemble a pipeline from its parts.
    pub fn new(adapter: OcrAdapter<B>, matcher: FieldMatcher<M>, catalog: LabelCatalog) -> Self {
        Self {
            adapter,
            matcher,
            catalog,
        }
    }

    /// Replace the label catalog.
    pub fn with_catalog(mut self, catalog: LabelCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// The label catalog in use.
    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    /// Run OCR on `path` and extract the filled fields.
    pub fn extract(&self, path: &Path) -> Result<ExtractionResult> {
        let start = Instant::now();

        let ocr = self.adapter.recognize_path(path)?;
        let report = self.extract_fragments(&ocr.fragments);

        info!(
            "Extracted {} fields in {} categories from {}",
            report.field_count(),
            report.sections.len(),
            path.display()
        );

        Ok(ExtractionResult {
            report,
            ocr,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Match and categorize already-recognized fragments.
    pub fn extract_fragments(&self, fragments: &[TextFragment]) -> CategorizedReport {
        let values = self.matcher.match_fields(fragments, &self.catalog);
        categorize(&values, &self.catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CiomsError, InputError, OcrError};
    use crate::models::form::Category;
    use crate::ocr::BoundingBox;
    use crate::report::format_text;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use pretty_assertions::assert_eq;

    struct FixedBackend(Vec<TextFragment>);

    impl OcrBackend for FixedBackend {
        fn recognize(&self, _image: &DynamicImage) -> std::result::Result<Vec<TextFragment>, OcrError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn frag(text: &str, x: f32, y: f32, w: f32, h: f32, confidence: f32) -> TextFragment {
        TextFragment::new(text, BoundingBox::new(x, y, w, h), confidence)
    }

    fn extractor(fragments: Vec<TextFragment>) -> CiomsExtractor<FixedBackend> {
        CiomsExtractor::from_config(FixedBackend(fragments), &CiomsConfig::default())
    }

    fn scanned_form(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("cioms_form.png");
        RgbImage::new(400, 300)
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();
        path
    }

    #[test]
    fn test_single_field_scenario() {
        let report = extractor(Vec::new()).extract_fragments(&[
            frag("Patient Initials", 10.0, 10.0, 80.0, 20.0, 0.95),
            frag("J.D.", 100.0, 10.0, 40.0, 20.0, 0.93),
        ]);

        assert_eq!(report.sections.len(), 1);
        assert_eq!(report.sections[0].category, Category::PatientInformation);
        assert_eq!(report.field_count(), 1);
        assert_eq!(report.get("Patient Initials"), Some("J.D."));
    }

    #[test]
    fn test_full_form() {
        let fragments = vec![
            frag("CIOMS FORM", 150.0, 0.0, 100.0, 20.0, 0.99),
            frag("1. PATIENT INITIALS", 10.0, 40.0, 120.0, 20.0, 0.95),
            frag("1a. COUNTRY", 200.0, 40.0, 80.0, 20.0, 0.95),
            frag("A.B.", 12.0, 62.0, 40.0, 18.0, 0.7),
            frag("Canada", 202.0, 62.0, 60.0, 18.0, 0.9),
            frag("Sex: F", 10.0, 100.0, 60.0, 20.0, 0.9),
            frag("Age", 200.0, 100.0, 30.0, 20.0, 0.9),
            frag("__", 240.0, 100.0, 30.0, 20.0, 0.5),
            frag("Suspect Drug(s):", 10.0, 140.0, 110.0, 20.0, 0.92),
            frag("Ibuprofen 400 mg", 130.0, 141.0, 120.0, 20.0, 0.85),
            frag("Reporter", 10.0, 180.0, 70.0, 20.0, 0.9),
            frag("Dr. Smith", 90.0, 180.0, 80.0, 20.0, 0.8),
            frag("Concomitant drugs", 10.0, 220.0, 130.0, 20.0, 0.9),
            frag("None", 150.0, 220.0, 40.0, 20.0, 0.9),
        ];

        let report = extractor(Vec::new()).extract_fragments(&fragments);

        let text = format_text(&report);
        let expected_fields = [
            "  Patient Initials: A.B.",
            "  Sex: F",
            "  Suspect Drug: Ibuprofen 400 mg",
            "  Reporter Name: Dr. Smith",
            "  Country: Canada",
        ];
        for line in expected_fields {
            assert!(text.contains(line), "missing {line:?} in\n{text}");
        }

        assert_eq!(report.field_count(), expected_fields.len());
        assert!(report.get("Age").is_none());
        assert!(report.get("Concomitant Medications").is_none());
        assert!(report.section(Category::AdditionalInformation).is_none());
    }

    #[test]
    fn test_extract_from_image_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = scanned_form(dir.path());

        let result = extractor(vec![
            frag("Suspect Drug:", 10.0, 50.0, 100.0, 20.0, 0.9),
            frag("Aspirin", 15.0, 72.0, 60.0, 18.0, 0.88),
        ])
        .extract(&path)
        .unwrap();

        assert_eq!(result.report.get("Suspect Drug"), Some("Aspirin"));
        assert_eq!(result.ocr.fragments.len(), 2);
        assert_eq!(result.ocr.engine, "fixed");
    }

    #[test]
    fn test_blank_image_gives_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = scanned_form(dir.path());

        let result = extractor(Vec::new()).extract(&path).unwrap();

        assert!(result.report.is_empty());
        assert_eq!(format_text(&result.report), crate::report::EMPTY_REPORT);
    }

    #[test]
    fn test_missing_file_is_input_error() {
        let err = extractor(Vec::new())
            .extract(Path::new("/no/such/form.jpg"))
            .unwrap_err();

        assert!(matches!(err, CiomsError::Input(InputError::NotFound(_))));
    }

    #[test]
    fn test_runs_are_independent() {
        let pipeline = extractor(Vec::new());
        let a = [
            frag("Age", 10.0, 10.0, 30.0, 20.0, 0.9),
            frag("45", 50.0, 10.0, 20.0, 20.0, 0.9),
        ];
        let b = [
            frag("Weight", 10.0, 10.0, 60.0, 20.0, 0.9),
            frag("70 kg", 80.0, 10.0, 40.0, 20.0, 0.9),
        ];

        let first = pipeline.extract_fragments(&a);
        let second = pipeline.extract_fragments(&b);

        assert_eq!(first.get("Age"), Some("45"));
        assert!(first.get("Weight").is_none());
        assert_eq!(second.get("Weight"), Some("70 kg"));
        assert!(second.get("Age").is_none());
        assert_eq!(first, pipeline.extract_fragments(&a));
    }

    #[test]
    fn test_custom_catalog() {
        use crate::models::form::FieldLabel;

        let catalog = LabelCatalog::new(vec![FieldLabel::new(
            "Study ID",
            Category::CaseDetails,
            &["study id"],
        )])
        .unwrap();

        let report = extractor(Vec::new())
            .with_catalog(catalog)
            .extract_fragments(&[
                frag("Study ID:", 10.0, 10.0, 60.0, 20.0, 0.9),
                frag("ST-42", 80.0, 10.0, 50.0, 20.0, 0.9),
                frag("Age", 10.0, 40.0, 30.0, 20.0, 0.9),
                frag("45", 50.0, 40.0, 20.0, 20.0, 0.9),
            ]);

        assert_eq!(report.get("Study ID"), Some("ST-42"));
        assert_eq!(report.field_count(), 1);
    }
}
