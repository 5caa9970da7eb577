//! Extract the filled fields from a single CIOMS form.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use cioms_core::models::config::{CiomsConfig, ModelConfig};
use cioms_core::ocr::validate_input;
use cioms_core::{CiomsExtractor, LabelCatalog, PureOcrEngine};

use crate::Cli;
use crate::output::format_report;

pub fn run(cli: Cli) -> anyhow::Result<()> {
    // Load configuration
    let config = match &cli.config {
        Some(path) => CiomsConfig::from_file(path)?,
        None => CiomsConfig::default(),
    };

    let catalog = match &cli.catalog {
        Some(path) => LabelCatalog::from_file(path)?,
        None => LabelCatalog::cioms(),
    };

    // Reject bad input before paying for model loading
    validate_input(&cli.input)?;

    let model_dir = resolve_model_dir(cli.model_dir.as_deref(), &config.models);
    debug!("Using OCR models from {}", model_dir.display());

    let pb = spinner();

    pb.set_message("Loading OCR models...");
    let engine = PureOcrEngine::from_dir(&model_dir, &config.models, config.ocr.clone())?;

    pb.set_message(format!("Reading {}...", cli.input.display()));
    let extractor = CiomsExtractor::from_config(engine, &config).with_catalog(catalog);
    let result = extractor.extract(&cli.input)?;

    pb.finish_and_clear();

    info!(
        "{} fragments from {} in {}ms",
        result.ocr.fragments.len(),
        result.ocr.engine,
        result.processing_time_ms
    );

    if cli.show_raw {
        eprintln!("{}", style("Raw OCR text:").bold());
        for line in result.ocr.lines(config.ocr.row_tolerance_px) {
            eprintln!("  {}", line);
        }
        eprintln!();
    }

    if result.report.is_empty() {
        warn!("No filled fields recognized in {}", cli.input.display());
    }

    let source = cli.input.display().to_string();
    let output = format_report(&result.report, &source, cli.format)?;

    // Write output
    if let Some(output_path) = &cli.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    Ok(())
}

/// Pick the model directory: explicit flag, then config, then the user data dir.
fn resolve_model_dir(explicit: Option<&Path>, models: &ModelConfig) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }

    if models.models_present(&models.model_dir) {
        return models.model_dir.clone();
    }

    dirs::data_dir()
        .map(|dir| dir.join("cioms").join("models"))
        .unwrap_or_else(|| models.model_dir.clone())
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_explicit_model_dir_wins() {
        let models = ModelConfig::default();
        let dir = resolve_model_dir(Some(Path::new("/opt/ocr")), &models);
        assert_eq!(dir, PathBuf::from("/opt/ocr"));
    }

    #[test]
    fn test_configured_dir_used_when_models_present() {
        let tmp = tempfile::tempdir().unwrap();
        let models = ModelConfig {
            model_dir: tmp.path().to_path_buf(),
            ..ModelConfig::default()
        };
        for name in [&models.detection_model, &models.recognition_model, &models.dictionary] {
            fs::write(tmp.path().join(name), b"").unwrap();
        }

        assert_eq!(resolve_model_dir(None, &models), tmp.path());
    }

    #[test]
    fn test_falls_back_to_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let models = ModelConfig {
            model_dir: tmp.path().join("missing"),
            ..ModelConfig::default()
        };

        let dir = resolve_model_dir(None, &models);
        match dirs::data_dir() {
            Some(data) => assert_eq!(dir, data.join("cioms").join("models")),
            None => assert_eq!(dir, models.model_dir),
        }
    }
}
