//! Text recognition via the `tesseract` executable
//!
//! The bitmap is piped to `tesseract stdin stdout ... tsv` as PNG and the
//! word-level TSV rows are folded into one fragment per text line.

use std::io::Cursor;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use image::{ImageFormat, RgbaImage};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{RecognitionLevel, RecognitionOptions, Result, TextFragment, TextRecognizer, VisionError};
use crate::analyze::geometry::RelativeBox;

/// TSV `level` value for word rows
const WORD_LEVEL: &str = "5";

/// Tesseract subprocess recognizer
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: PathBuf,
}

impl TesseractRecognizer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Resolve `name` (a bare command or a path) to an executable.
    pub fn locate(name: &str) -> Result<Self> {
        which::which(name)
            .map(Self::new)
            .map_err(|e| VisionError::Unavailable(format!("{name}: {e}")))
    }

    /// Command line arguments after `stdin stdout`.
    fn build_args(options: &RecognitionOptions) -> Vec<String> {
        let mut args = Vec::new();

        let languages: Vec<String> = options
            .languages
            .iter()
            .map(|tag| tesseract_language(tag))
            .collect();
        if !languages.is_empty() {
            args.push("-l".to_string());
            args.push(languages.join("+"));
        }

        if options.level == RecognitionLevel::Accurate {
            // LSTM engine only
            args.push("--oem".to_string());
            args.push("1".to_string());
        }

        if !options.use_correction {
            for var in ["load_system_dawg=0", "load_freq_dawg=0"] {
                args.push("-c".to_string());
                args.push(var.to_string());
            }
        }

        args.push("tsv".to_string());
        args
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(
        &self,
        bitmap: &RgbaImage,
        options: &RecognitionOptions,
    ) -> Result<Vec<TextFragment>> {
        let (width, height) = bitmap.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let mut png = Vec::new();
        bitmap.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout"])
            .args(Self::build_args(options))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| VisionError::Recognition("tesseract stdin unavailable".to_string()))?;
        let feed = async move {
            stdin.write_all(&png).await?;
            stdin.shutdown().await
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;

        // An early exit breaks the stdin pipe; its status says more than EPIPE
        check_status(&output)?;
        fed?;

        let tsv = String::from_utf8_lossy(&output.stdout);
        let fragments = parse_tsv(&tsv, width, height);
        tracing::debug!("tesseract recognized {} lines", fragments.len());
        Ok(fragments)
    }
}

fn check_status(output: &std::process::Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(VisionError::Recognition(format!(
        "tesseract exited with {}: {}",
        output.status,
        stderr.trim()
    )))
}

/// Map a BCP-47 tag onto tesseract's traineddata name.
fn tesseract_language(tag: &str) -> String {
    let lower = tag.to_lowercase();
    let code = match lower.as_str() {
        "zh-hant" | "zh-tw" | "zh-hk" => "chi_tra",
        "zh-hans" | "zh-cn" | "zh" => "chi_sim",
        "ja" | "ja-jp" => "jpn",
        "ko" | "ko-kr" => "kor",
        "de" | "de-de" => "deu",
        "fr" | "fr-fr" => "fra",
        "es" | "es-es" => "spa",
        _ if lower == "en" || lower.starts_with("en-") => "eng",
        // Already a tesseract code, or something we can't map
        _ => return tag.to_string(),
    };
    code.to_string()
}

/// Words of one text line, accumulated in TSV order.
struct LineAccumulator {
    key: (String, String, String, String),
    words: Vec<String>,
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
    confidence_sum: f32,
}

/// Fold tesseract's word rows into line fragments.
///
/// Boxes are converted to the bottom-left relative convention.
fn parse_tsv(tsv: &str, width: u32, height: u32) -> Vec<TextFragment> {
    let mut lines: Vec<LineAccumulator> = Vec::new();

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.splitn(12, '\t').collect();
        if cols.len() < 12 || cols[0] != WORD_LEVEL {
            continue;
        }
        let text = cols[11].trim();
        if text.is_empty() {
            continue;
        }
        let (Ok(left), Ok(top), Ok(w), Ok(h), Ok(conf)) = (
            cols[6].parse::<u32>(),
            cols[7].parse::<u32>(),
            cols[8].parse::<u32>(),
            cols[9].parse::<u32>(),
            cols[10].parse::<f32>(),
        ) else {
            continue;
        };
        if conf < 0.0 {
            continue;
        }

        let key = (
            cols[1].to_string(),
            cols[2].to_string(),
            cols[3].to_string(),
            cols[4].to_string(),
        );

        match lines.last_mut() {
            Some(line) if line.key == key => {
                line.words.push(text.to_string());
                line.left = line.left.min(left);
                line.top = line.top.min(top);
                line.right = line.right.max(left.saturating_add(w));
                line.bottom = line.bottom.max(top.saturating_add(h));
                line.confidence_sum += conf;
            }
            _ => lines.push(LineAccumulator {
                key,
                words: vec![text.to_string()],
                left,
                top,
                right: left.saturating_add(w),
                bottom: top.saturating_add(h),
                confidence_sum: conf,
            }),
        }
    }

    let w = f64::from(width);
    let h = f64::from(height);

    lines
        .into_iter()
        .map(|line| {
            let right = line.right.min(width);
            let bottom = line.bottom.min(height);
            let bounds = RelativeBox::new(
                f64::from(line.left) / w,
                1.0 - f64::from(bottom) / h,
                f64::from(right.saturating_sub(line.left)) / w,
                f64::from(bottom.saturating_sub(line.top)) / h,
            );
            let confidence =
                (line.confidence_sum / line.words.len() as f32 / 100.0).clamp(0.0, 1.0);
            TextFragment::new(line.words.join(" "), bounds, confidence)
        })
        .collect()
}
