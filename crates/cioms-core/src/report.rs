//! Human-readable rendering of a categorized report.

use crate::models::form::CategorizedReport;

const RULE_WIDTH: usize = 60;

/// Title printed at the top of every non-empty report.
pub const REPORT_TITLE: &str = "CIOMS FORM - EXTRACTED DATA (FILLED FIELDS ONLY)";

/// Message printed when no field was filled.
pub const EMPTY_REPORT: &str = "No filled fields found in the form.";

/// Render a report as grouped "Label: Value" sections.
pub fn format_text(report: &CategorizedReport) -> String {
    if report.is_empty() {
        return EMPTY_REPORT.to_string();
    }

    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec![rule.clone(), REPORT_TITLE.to_string(), rule.clone()];

    for section in &report.sections {
        let title = section.category.display_name();
        lines.push(String::new());
        lines.push(title.to_string());
        lines.push("-".repeat(title.len()));

        for field in &section.fields {
            lines.push(format!("  {}: {}", field.label, field.value));
        }
    }

    lines.push(String::new());
    lines.push(rule);
    lines.join("\n")
}
