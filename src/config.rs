//! Layered configuration: built-in defaults, then an optional TOML file,
//! then command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::gibberish::GibberishOptions;
use crate::matcher::MatchOptions;
use crate::segment::SegmentOptions;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    pub min_seg_width: u32,
    pub dark_threshold: u8,
    pub margin: u32,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        let options = SegmentOptions::default();
        Self {
            min_seg_width: options.min_seg_width,
            dark_threshold: options.dark_threshold,
            margin: options.margin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Run the OCR search at all. Without it segments are cropped only.
    pub enabled: bool,
    /// Language set handed to the engine.
    pub languages: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            languages: crate::ocr::OCR_LANGUAGES.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub baseline_threshold: f64,
    pub baseline_accept: f64,
    pub author_title_accept: f64,
    pub title_only_accept: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        let options = MatchOptions::default();
        Self {
            baseline_threshold: 0.82,
            baseline_accept: options.baseline_accept,
            author_title_accept: options.author_title_accept,
            title_only_accept: options.title_only_accept,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GibberishConfig {
    /// Special-character fraction used by the deletion pass.
    pub special_fraction: f64,
    /// Laxer fraction used by the quarantine pass.
    pub quarantine_special_fraction: f64,
}

impl Default for GibberishConfig {
    fn default() -> Self {
        Self {
            special_fraction: 0.20,
            quarantine_special_fraction: 0.22,
        }
    }
}

/// Full configuration tree. Unknown keys are ignored; missing sections
/// fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub segment: SegmentConfig,
    pub ocr: OcrConfig,
    pub matching: MatchingConfig,
    pub gibberish: GibberishConfig,
}

/// Command-line values that override the file configuration when present.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub min_seg_width: Option<u32>,
    pub dark_threshold: Option<u8>,
    pub margin: Option<u32>,
    pub baseline_threshold: Option<f64>,
    pub ocr_enabled: Option<bool>,
}

impl Config {
    /// Load from an explicit path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Load from the default locations: `./spinescan.toml`, then the user
    /// config directory. Missing files mean defaults, not errors.
    pub fn load() -> Result<Self> {
        for path in Self::default_paths() {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }
        Ok(Self::default())
    }

    fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("spinescan.toml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("spinescan").join("config.toml"));
        }
        paths
    }

    /// Apply command-line overrides on top of the loaded file.
    pub fn merge_with_cli(mut self, cli: &CliOverrides) -> Self {
        if let Some(v) = cli.min_seg_width {
            self.segment.min_seg_width = v;
        }
        if let Some(v) = cli.dark_threshold {
            self.segment.dark_threshold = v;
        }
        if let Some(v) = cli.margin {
            self.segment.margin = v;
        }
        if let Some(v) = cli.baseline_threshold {
            self.matching.baseline_threshold = v;
        }
        if let Some(v) = cli.ocr_enabled {
            self.ocr.enabled = v;
        }
        self
    }

    /// View as segmenter options.
    pub fn segment_options(&self) -> SegmentOptions {
        SegmentOptions {
            min_seg_width: self.segment.min_seg_width,
            dark_threshold: self.segment.dark_threshold,
            margin: self.segment.margin,
        }
    }

    /// View as matcher options.
    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            baseline_accept: self.matching.baseline_accept,
            author_title_accept: self.matching.author_title_accept,
            title_only_accept: self.matching.title_only_accept,
            ..MatchOptions::default()
        }
    }

    /// Gibberish options for the deletion pass.
    pub fn cleanup_gibberish_options(&self) -> GibberishOptions {
        GibberishOptions {
            special_fraction: self.gibberish.special_fraction,
            count_single_letter_tokens: false,
        }
    }

    /// Gibberish options for the quarantine pass.
    pub fn quarantine_gibberish_options(&self) -> GibberishOptions {
        GibberishOptions {
            special_fraction: self.gibberish.quarantine_special_fraction,
            count_single_letter_tokens: true,
        }
    }
}
