//! `pagelens` CLI - Analyse a PDF into text, tables, charts and images

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use pagelens::cli::{emit_report, init_tracing, parse_args, report_failure, show_progress};
use pagelens::{
    bind_pdfium, AnalysisReport, CancelToken, Config, DocumentAnalyzer, PdfPageSource,
    ProgressEvent, ReportFormat,
};

#[derive(Parser)]
#[command(name = "pagelens")]
#[command(about = "Extract text, tables, charts and images from a PDF document")]
#[command(version)]
struct Cli {
    /// PDF document to analyse
    input: PathBuf,

    /// Write the report here instead of stdout (a `.json` extension selects JSON)
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

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let analyzer = DocumentAnalyzer::new(config.vision.engine(), &config.analysis)
        .with_progress(Box::new(|event: &ProgressEvent| show_progress(event)))
        .with_cancel(cancel);

    let pdfium = bind_pdfium();
    let input: &Path = &cli.input;
    let result = analyzer
        .open_and_analyze(|| PdfPageSource::open(pdfium.as_ref().map_err(Clone::clone)?, input))
        .await?;

    let output = cli.output.as_deref();
    let report = AnalysisReport::generate(&result, ReportFormat::from_path(output))?;
    emit_report(&report, output)
}
