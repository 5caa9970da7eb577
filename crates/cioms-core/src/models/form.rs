//! CIOMS form data models: categories, labels, and extracted fields.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic grouping of CIOMS form fields.
///
/// Declaration order is the order sections appear in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Patient demographics (initials, age, sex, ...).
    PatientInformation,
    /// The adverse reaction itself.
    AdverseEvent,
    /// Suspect drug and therapy details.
    DrugInformation,
    /// Who reported the case.
    ReporterInformation,
    /// Case bookkeeping (case number, country, ...).
    CaseDetails,
    /// History, concomitant medication, free-text comments.
    AdditionalInformation,
}

impl Category {
    /// All categories in report order.
    pub const ALL: [Category; 6] = [
        Category::PatientInformation,
        Category::AdverseEvent,
        Category::DrugInformation,
        Category::ReporterInformation,
        Category::CaseDetails,
        Category::AdditionalInformation,
    ];

    /// Human-readable section title.
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::PatientInformation => "Patient Information",
            Category::AdverseEvent => "Adverse Event",
            Category::DrugInformation => "Drug Information",
            Category::ReporterInformation => "Reporter Information",
            Category::CaseDetails => "Case Details",
            Category::AdditionalInformation => "Additional Information",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A printed label on the form and the phrasings OCR may produce for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLabel {
    /// Canonical label name, e.g. "Patient Initials".
    pub name: String,

    /// Category the field is reported under.
    pub category: Category,

    /// Known printed variants, matched case- and punctuation-insensitively.
    pub phrasings: Vec<String>,
}

impl FieldLabel {
    /// Create a label from static table data.
    pub fn new(name: &str, category: Category, phrasings: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            category,
            phrasings: phrasings.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// A filled field: label, non-empty value, and category.
///
/// Reports are output only, so the report types serialize but do not
/// deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedField {
    /// Label name.
    pub label: String,

    /// Extracted value; never empty.
    pub value: String,

    /// Category of the label.
    #[serde(skip)]
    pub category: Category,
}

/// One non-empty category and its fields in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySection {
    /// The category.
    pub category: Category,

    /// Fields in catalog order.
    pub fields: Vec<ExtractedField>,
}

/// Grouped extraction output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategorizedReport {
    /// Sections in category order; empty categories are never present.
    pub sections: Vec<CategorySection>,
}

impl CategorizedReport {
    /// Whether no field was extracted.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Total number of extracted fields.
    pub fn field_count(&self) -> usize {
        self.sections.iter().map(|s| s.fields.len()).sum()
    }

    /// Iterate over all fields in report order.
    pub fn fields(&self) -> impl Iterator<Item = &ExtractedField> {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }

    /// Look up the value of a field by label name.
    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
    }

    /// Get the section for a category, if it has any fields.
    pub fn section(&self, category: Category) -> Option<&CategorySection> {
        self.sections.iter().find(|s| s.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_order_matches_declaration() {
        let mut sorted = Category::ALL;
        sorted.sort();
        assert_eq!(sorted, Category::ALL);
    }

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&Category::ReporterInformation).unwrap();
        assert_eq!(json, "\"reporter_information\"");
        assert_eq!(Category::CaseDetails.to_string(), "Case Details");
    }

    #[test]
    fn test_field_serializes_without_category() {
        let field = ExtractedField {
            label: "Patient Initials".to_string(),
            value: "J.D.".to_string(),
            category: Category::PatientInformation,
        };
        let report = CategorizedReport {
            sections: vec![CategorySection {
                category: Category::PatientInformation,
                fields: vec![field],
            }],
        };

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["sections"][0]["category"], "patient_information");
        assert_eq!(
            json["sections"][0]["fields"][0],
            serde_json::json!({ "label": "Patient Initials", "value": "J.D." })
        );
    }
}
