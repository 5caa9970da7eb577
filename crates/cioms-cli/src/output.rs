//! Report rendering for the supported output formats.

use serde::Serialize;

use cioms_core::models::form::{CategorizedReport, CategorySection};
use cioms_core::report::format_text;

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Grouped plain text report
    Text,
    /// JSON output
    Json,
    /// CSV output
    Csv,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    source: &'a str,
    categories: &'a [CategorySection],
    field_count: usize,
}

pub fn format_report(report: &CategorizedReport, source: &str, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(format_text(report)),
        OutputFormat::Json => format_json(report, source),
        OutputFormat::Csv => format_csv(report),
    }
}

fn format_json(report: &CategorizedReport, source: &str) -> anyhow::Result<String> {
    let json = JsonReport {
        source,
        categories: &report.sections,
        field_count: report.field_count(),
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

fn format_csv(report: &CategorizedReport) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["category", "label", "value"])?;

    for section in &report.sections {
        for field in &section.fields {
            wtr.write_record([
                section.category.display_name(),
                field.label.as_str(),
                field.value.as_str(),
            ])?;
        }
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}
