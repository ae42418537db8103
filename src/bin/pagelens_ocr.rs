//! `pagelens-ocr` - Recognize the text of a single image

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use pagelens::cli::{emit_report, init_tracing, parse_args, report_failure, show_progress};
use pagelens::ocr::OcrStage;
use pagelens::{Config, OcrService};

#[derive(Parser)]
#[command(name = "pagelens-ocr")]
#[command(about = "Recognize the text in an image file")]
#[command(version)]
struct Cli {
    /// Image to recognize (PNG, JPEG or TIFF)
    input: PathBuf,

    /// Write the text here instead of stdout
    output: Option<PathBuf>,

    /// Configuration file (default: ~/.config/pagelens/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match parse_args::<Cli>() {
        Ok(cli) => cli,
        Err(code) => return code,
    };
    init_tracing();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_failure(&e),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let ocr = OcrService::new(config.vision.engine(), config.analysis.recognition_options())
        .with_progress(Box::new(|stage: &OcrStage| show_progress(stage)));

    let text = ocr.recognize_file(&cli.input).await?;
    emit_report(&text, cli.output.as_deref())
}
