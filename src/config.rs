//! Configuration loaded from `~/.config/pagelens/config.toml`.
//!
//! Every key is optional:
//!
//! ```toml
//! [analysis]
//! structure_threshold = 4
//! row_threshold = 0.1
//! languages = ["zh-Hant", "en-US"]
//!
//! [vision]
//! timeout_secs = 120
//! tesseract_path = "tesseract"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analyze::AnalyzerConfig;
use crate::vision::{ContourDetector, TesseractRecognizer, VisionEngine};

/// Vision backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Upper bound for a single detection or recognition call
    pub timeout_secs: u64,
    /// `tesseract` executable, bare name or path
    pub tesseract_path: String,
    /// Minimum rectangle side, relative to the bitmap's shorter side
    pub min_size: f64,
    /// Luma below this value counts as ink
    pub ink_threshold: u8,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            tesseract_path: "tesseract".to_string(),
            min_size: 0.05,
            ink_threshold: 128,
        }
    }
}

impl VisionConfig {
    /// Contour detector plus tesseract, bounded by `timeout_secs`.
    ///
    /// The tesseract binary is resolved through `PATH` when possible; a
    /// missing binary surfaces later as a per-call recognition error.
    pub fn engine(&self) -> VisionEngine {
        let recognizer = match TesseractRecognizer::locate(&self.tesseract_path) {
            Ok(recognizer) => recognizer,
            Err(e) => {
                tracing::warn!("{e}; table text recognition will fail");
                TesseractRecognizer::new(&self.tesseract_path)
            }
        };
        VisionEngine::new(
            Arc::new(ContourDetector::new(self.min_size, self.ink_threshold)),
            Arc::new(recognizer),
            Duration::from_secs(self.timeout_secs),
        )
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalyzerConfig,
    pub vision: VisionConfig,
}

impl Config {
    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load from `path`. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }
}

/// Return the path to the config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pagelens")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_config_overrides_named_keys_only() {
        let toml_str = r#"
[analysis]
structure_threshold = 6
languages = ["en-US"]

[vision]
timeout_secs = 30
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.analysis.structure_threshold, 6);
        assert_eq!(config.analysis.languages, vec!["en-US"]);
        assert!((config.analysis.row_threshold - 0.1).abs() < f64::EPSILON);
        assert!(config.analysis.sort_cells_by_x);
        assert_eq!(config.vision.timeout_secs, 30);
        assert_eq!(config.vision.tesseract_path, "tesseract");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[analysis]\nrow_threshold = \"wide\"\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("invalid TOML"));
    }

    #[test]
    fn config_path_ends_with_app_dir() {
        assert!(config_path().ends_with("pagelens/config.toml"));
    }
}
