//! Shared plumbing for the command-line binaries

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::analyze::report::write_atomically;

/// Parse arguments. Help and version requests exit 0, usage errors exit 1.
pub fn parse_args<T: Parser>() -> std::result::Result<T, ExitCode> {
    T::try_parse().map_err(|err| {
        let _ = err.print();
        if err.use_stderr() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    })
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Print a timestamped progress line to stderr.
pub fn show_progress(message: impl std::fmt::Display) {
    eprintln!("[{}] {message}", chrono::Local::now().format("%H:%M:%S"));
}

/// Write the report to `output`, or print it to stdout.
pub fn emit_report(report: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            write_atomically(path, report)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            show_progress(format!("Results saved to: {}", path.display()));
        }
        None => println!("\n{report}"),
    }
    Ok(())
}

/// Print an error chain on one line and map it to exit code 1.
pub fn report_failure(err: &anyhow::Error) -> ExitCode {
    eprintln!("Error: {err:#}");
    ExitCode::FAILURE
}
