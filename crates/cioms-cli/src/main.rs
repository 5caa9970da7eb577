//! CLI application for CIOMS form extraction.

mod extract;
mod output;

use std::path::PathBuf;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use output::OutputFormat;

/// CIOMS form extraction - report the filled fields of a scanned CIOMS form
#[derive(Parser)]
#[command(name = "cioms")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input file (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// OCR model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON label catalog replacing the built-in CIOMS labels
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Print the raw OCR lines to stderr before the report
    #[arg(long)]
    show_raw: bool,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    extract::run(cli)
}
