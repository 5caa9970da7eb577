//! The CIOMS field label catalog.
//!
//! The catalog is plain tabular data: label name, category, and the printed
//! phrasings that identify it. Catalog order is the order fields are reported
//! within a category.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::form::{Category, FieldLabel};
use crate::error::{CiomsError, Result};

/// Built-in CIOMS labels as `(name, category, phrasings)`.
const CIOMS_LABELS: &[(&str, Category, &[&str])] = &[
    // Patient
    (
        "Patient Initials",
        Category::PatientInformation,
        &["patient initials", "patient initial", "patient init", "initials"],
    ),
    (
        "Date of Birth",
        Category::PatientInformation,
        &["date of birth", "birth date", "dob"],
    ),
    ("Age", Category::PatientInformation, &["age", "age at event"]),
    ("Sex", Category::PatientInformation, &["sex", "gender"]),
    ("Weight", Category::PatientInformation, &["weight"]),
    ("Height", Category::PatientInformation, &["height"]),
    // Reaction
    (
        "Adverse Reaction",
        Category::AdverseEvent,
        &[
            "adverse reaction",
            "adverse event",
            "reaction description",
            "describe reaction",
            "reaction",
        ],
    ),
    (
        "Onset Date",
        Category::AdverseEvent,
        &[
            "reaction onset date",
            "reaction onset",
            "onset date",
            "date of onset",
            "date of event",
        ],
    ),
    (
        "End Date",
        Category::AdverseEvent,
        &["reaction end date", "date of recovery", "date of resolution"],
    ),
    ("Outcome", Category::AdverseEvent, &["outcome", "resulted in"]),
    ("Seriousness", Category::AdverseEvent, &["seriousness", "serious"]),
    // Drug
    (
        "Suspect Drug",
        Category::DrugInformation,
        &[
            "suspect drug",
            "suspected drug",
            "product name",
            "drug name",
            "medication",
        ],
    ),
    ("Dose", Category::DrugInformation, &["daily dose", "dose", "dosage"]),
    (
        "Route of Administration",
        Category::DrugInformation,
        &["route of administration", "route"],
    ),
    (
        "Indication",
        Category::DrugInformation,
        &["indication", "indication for use", "reason for use"],
    ),
    (
        "Therapy Start Date",
        Category::DrugInformation,
        &["therapy start date", "therapy dates", "start date", "begin date"],
    ),
    (
        "Therapy End Date",
        Category::DrugInformation,
        &["therapy end date", "therapy end", "stop date", "end date"],
    ),
    (
        "Batch/Lot Number",
        Category::DrugInformation,
        &["batch number", "lot number", "lot no", "batch", "lot"],
    ),
    (
        "Manufacturer",
        Category::DrugInformation,
        &["manufacturer", "name and address of manufacturer"],
    ),
    // Reporter
    (
        "Reporter Name",
        Category::ReporterInformation,
        &["reporter name", "reporter", "reported by"],
    ),
    (
        "Report Date",
        Category::ReporterInformation,
        &["report date", "date of this report", "report received", "date received"],
    ),
    (
        "Telephone",
        Category::ReporterInformation,
        &[
            "telephone number",
            "telephone",
            "phone number",
            "phone",
            "tel no",
            "tel",
        ],
    ),
    // Case
    (
        "Case Number",
        Category::CaseDetails,
        &["case number", "case no", "case id", "mfr control no"],
    ),
    ("Country", Category::CaseDetails, &["country", "nation"]),
    ("Action Taken", Category::CaseDetails, &["action taken"]),
    // Additional
    (
        "Medical History",
        Category::AdditionalInformation,
        &["medical history", "relevant history", "other relevant history"],
    ),
    (
        "Concomitant Medications",
        Category::AdditionalInformation,
        &[
            "concomitant medications",
            "concomitant medication",
            "concomitant drugs",
            "concomitant drug",
            "concomitant therapy",
        ],
    ),
    (
        "Comments",
        Category::AdditionalInformation,
        &["comments", "comment", "remarks", "remark", "notes"],
    ),
];

/// Ordered collection of field labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelCatalog {
    labels: Vec<FieldLabel>,
}

impl LabelCatalog {
    /// Build the standard CIOMS catalog.
    pub fn cioms() -> Self {
        Self {
            labels: CIOMS_LABELS
                .iter()
                .map(|(name, category, phrasings)| FieldLabel::new(name, *category, phrasings))
                .collect(),
        }
    }

    /// Build a catalog from labels, rejecting empty or phrasing-less entries.
    pub fn new(labels: Vec<FieldLabel>) -> Result<Self> {
        if labels.is_empty() {
            return Err(CiomsError::Config("label catalog is empty".to_string()));
        }

        if let Some(label) = labels
            .iter()
            .find(|l| l.phrasings.iter().all(|p| p.trim().is_empty()))
        {
            return Err(CiomsError::Config(format!(
                "label '{}' has no phrasings",
                label.name
            )));
        }

        Ok(Self { labels })
    }

    /// Load a catalog from a JSON file (`[{ "name", "category", "phrasings" }]`).
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let labels: Vec<FieldLabel> = serde_json::from_str(&content)
            .map_err(|e| CiomsError::Config(format!("{}: {}", path.display(), e)))?;

        debug!("Loaded {} labels from {}", labels.len(), path.display());
        Self::new(labels)
    }

    /// Labels in catalog order.
    pub fn labels(&self) -> &[FieldLabel] {
        &self.labels
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the catalog has no labels.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Find a label by name.
    pub fn get(&self, name: &str) -> Option<&FieldLabel> {
        self.labels.iter().find(|l| l.name == name)
    }

    /// Position of a label in catalog order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.labels.iter().position(|l| l.name == name)
    }
}

impl Default for LabelCatalog {
    fn default() -> Self {
        Self::cioms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cioms_catalog_shape() {
        let catalog = LabelCatalog::cioms();

        assert_eq!(catalog.len(), 28);
        assert_eq!(
            catalog.get("Patient Initials").map(|l| l.category),
            Some(Category::PatientInformation)
        );
        assert_eq!(
            catalog.get("Action Taken").map(|l| l.category),
            Some(Category::CaseDetails)
        );
    }

    #[test]
    fn test_labels_grouped_by_category_in_report_order() {
        let catalog = LabelCatalog::cioms();
        let categories: Vec<Category> = catalog.labels().iter().map(|l| l.category).collect();

        let mut sorted = categories.clone();
        sorted.sort();
        assert_eq!(categories, sorted);
    }

    #[test]
    fn test_every_label_has_phrasings() {
        for label in LabelCatalog::cioms().labels() {
            assert!(!label.phrasings.is_empty(), "{} has no phrasings", label.name);
        }
    }

    #[test]
    fn test_new_rejects_empty() {
        assert!(LabelCatalog::new(Vec::new()).is_err());

        let label = FieldLabel::new("Empty", Category::CaseDetails, &["  "]);
        assert!(LabelCatalog::new(vec![label]).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"[{ "name": "Study ID", "category": "case_details", "phrasings": ["study id", "protocol no"] }]"#,
        )
        .unwrap();

        let catalog = LabelCatalog::from_file(&path).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.labels()[0].phrasings, vec!["study id", "protocol no"]);
    }
}
