//! Analysis report generation
//!
//! Generates the human-readable report and its JSON counterpart from an
//! analysis result.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;
use std::path::Path;

use super::{AnalysisResult, ChartType, Result};

/// Report output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Plain text (default)
    #[default]
    Text,
    /// JSON (machine-readable)
    Json,
}

impl ReportFormat {
    /// JSON for `.json` outputs, text otherwise.
    pub fn from_path(path: Option<&Path>) -> Self {
        match path.and_then(Path::extension) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Region counts for one page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageStats {
    pub page: usize,
    pub tables: usize,
    pub charts: usize,
    pub images: usize,
    pub unclassified: usize,
}

/// Analysis report generator
pub struct AnalysisReport;

impl AnalysisReport {
    /// Generate report in specified format
    pub fn generate(result: &AnalysisResult, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Self::to_text(result),
            ReportFormat::Json => Self::to_json(result),
        }
    }

    /// Save report to file
    pub fn save(result: &AnalysisResult, format: ReportFormat, path: &Path) -> Result<()> {
        let content = Self::generate(result, format)?;
        write_atomically(path, &content)?;
        Ok(())
    }

    fn to_json(result: &AnalysisResult) -> Result<String> {
        Ok(serde_json::to_string_pretty(result)?)
    }

    fn to_text(result: &AnalysisResult) -> Result<String> {
        let mut out = String::new();

        writeln!(out, "Document Analysis Report")?;
        writeln!(out, "========================\n")?;

        writeln!(out, "Text Content:")?;
        writeln!(out, "-------------")?;
        writeln!(out, "{}", result.text())?;

        writeln!(out, "Summary:")?;
        writeln!(out, "--------")?;
        writeln!(out, "Tables: {}", result.tables().len())?;
        writeln!(out, "Charts: {}", result.chart_count())?;
        writeln!(out, "Images: {}", result.images().len())?;
        writeln!(out, "Unclassified regions: {}", result.unclassified_count())?;

        let stats = Self::page_stats(result);
        if !stats.is_empty() {
            writeln!(out)?;
            for s in &stats {
                write!(
                    out,
                    "Page {}: {} tables, {} charts, {} images",
                    s.page + 1,
                    s.tables,
                    s.charts,
                    s.images
                )?;
                if s.unclassified > 0 {
                    write!(out, ", {} unclassified", s.unclassified)?;
                }
                writeln!(out)?;
            }
        }

        writeln!(out, "\nTable Content:")?;
        writeln!(out, "--------------")?;
        for (i, table) in result.tables().iter().enumerate() {
            writeln!(out, "\nTable {}:", i + 1)?;
            out.push_str(&table.grid.to_tsv());
        }

        Ok(out)
    }

    /// Per-page region counts, for pages with at least one region.
    pub fn page_stats(result: &AnalysisResult) -> Vec<PageStats> {
        fn entry(pages: &mut BTreeMap<usize, PageStats>, page: usize) -> &mut PageStats {
            pages.entry(page).or_insert_with(|| PageStats {
                page,
                ..PageStats::default()
            })
        }

        let mut pages: BTreeMap<usize, PageStats> = BTreeMap::new();
        for table in result.tables() {
            entry(&mut pages, table.page).tables += 1;
        }
        for chart in result.charts() {
            let stats = entry(&mut pages, chart.page);
            match chart.kind {
                ChartType::Unknown => stats.unclassified += 1,
                _ => stats.charts += 1,
            }
        }
        for image in result.images() {
            entry(&mut pages, image.page).images += 1;
        }

        pages.into_values().collect()
    }
}

/// Replace `path` with `contents` in one step.
///
/// The data goes to a temporary file in the target directory first and is
/// renamed over `path` only once fully written, so a failed write never
/// leaves a truncated report. The temporary file is removed on failure.
pub fn write_atomically(path: &Path, contents: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
