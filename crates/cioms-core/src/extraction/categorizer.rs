//! Grouping of matched values into report categories.

use tracing::debug;

use crate::models::catalog::LabelCatalog;
use crate::models::form::{CategorizedReport, CategorySection, Category, ExtractedField};

use super::matcher::MatchedValue;
use super::patterns::{clean_value, is_filled};

/// Group matched values by category.
///
/// Sections follow [`Category`] order and fields follow catalog order,
/// whatever order `values` arrive in. Unfilled values and labels unknown to
/// the catalog are dropped; categories without fields are omitted.
pub fn categorize(values: &[MatchedValue], catalog: &LabelCatalog) -> CategorizedReport {
    let mut ordered: Vec<(usize, ExtractedField)> = values
        .iter()
        .filter_map(|m| {
            let Some(position) = catalog.position(&m.label) else {
                debug!("Dropping value for unknown label '{}'", m.label);
                return None;
            };

            if !is_filled(&m.value) {
                return None;
            }

            let label = &catalog.labels()[position];
            Some((
                position,
                ExtractedField {
                    label: label.name.clone(),
                    value: clean_value(&m.value),
                    category: label.category,
                },
            ))
        })
        .collect();

    ordered.sort_by_key(|(position, _)| *position);
    ordered.dedup_by_key(|(position, _)| *position);

    let sections = Category::ALL
        .iter()
        .filter_map(|&category| {
            let fields: Vec<ExtractedField> = ordered
                .iter()
                .filter(|(_, f)| f.category == category)
                .map(|(_, f)| f.clone())
                .collect();

            (!fields.is_empty()).then_some(CategorySection { category, fields })
        })
        .collect();

    CategorizedReport { sections }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn value(label: &str, value: &str) -> MatchedValue {
        MatchedValue {
            label: label.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_groups_in_category_and_catalog_order() {
        let catalog = LabelCatalog::cioms();
        let values = vec![
            value("Comments", "Follow-up requested"),
            value("Sex", "F"),
            value("Suspect Drug", "Aspirin"),
            value("Patient Initials", "J.D."),
        ];

        let report = categorize(&values, &catalog);

        let layout: Vec<(Category, Vec<&str>)> = report
            .sections
            .iter()
            .map(|s| (s.category, s.fields.iter().map(|f| f.label.as_str()).collect()))
            .collect();

        assert_eq!(
            layout,
            vec![
                (Category::PatientInformation, vec!["Patient Initials", "Sex"]),
                (Category::DrugInformation, vec!["Suspect Drug"]),
                (Category::AdditionalInformation, vec!["Comments"]),
            ]
        );
    }

    #[test]
    fn test_empty_values_dropped() {
        let catalog = LabelCatalog::cioms();
        let values = vec![value("Age", "  "), value("Weight", "N/A"), value("Height", "172 cm")];

        let report = categorize(&values, &catalog);

        assert_eq!(report.field_count(), 1);
        assert_eq!(report.get("Height"), Some("172 cm"));
        assert!(report.section(Category::AdverseEvent).is_none());
    }

    #[test]
    fn test_unknown_labels_dropped() {
        let catalog = LabelCatalog::cioms();
        let report = categorize(&[value("Favourite Colour", "Blue")], &catalog);
        assert!(report.is_empty());
    }

    #[test]
    fn test_no_values_gives_empty_report() {
        let report = categorize(&[], &LabelCatalog::cioms());
        assert!(report.is_empty());
        assert_eq!(report.field_count(), 0);
    }

    #[test]
    fn test_idempotent() {
        let catalog = LabelCatalog::cioms();
        let values = vec![
            value("Outcome", "Recovered"),
            value("Age", "45"),
            value("Case Number", "PV-2024-001"),
        ];

        let first = categorize(&values, &catalog);
        let second = categorize(&values, &catalog);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
